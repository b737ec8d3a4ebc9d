//! Typed pipeline steps and per-page image processing.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::imaging::{self, footer::FooterRenderer, footer::MIN_FOOTER_HEIGHT};
use crate::model::Page;

/// What a step does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Re-encode each page as JPEG
    ImageCopy,
    /// Re-encode with a maximum dimension
    ImageScale,
    /// Append the footer band (template only)
    ImageFooter,
    /// Append the footer band with per-page granular URNs
    ImageFooterGranular,
    /// Compose the PDF from the final images
    Pdf,
    /// Write the PDF references back into the METS file
    Enrich,
}

impl StepKind {
    /// Whether pages are processed in parallel by this step.
    pub fn is_image_step(&self) -> bool {
        !matches!(self, StepKind::Pdf | StepKind::Enrich)
    }
}

/// One executable step of the run plan.
#[derive(Debug, Clone)]
pub struct Step {
    /// Step kind
    pub kind: StepKind,
    /// Directory the step reads page images from
    pub input_dir: PathBuf,
    /// Directory the step writes into (same as input for Pdf/Enrich)
    pub output_dir: PathBuf,
    /// JPEG quality for re-encoding
    pub quality: u8,
    /// Maximum dimension; 0 disables scaling
    pub maximal: u32,
}

impl Step {
    /// Output location for a page processed by this step.
    fn output_path(&self, page: &Page) -> PathBuf {
        self.output_dir.join(format!("{}.jpg", page.stem()))
    }

    /// Process one page of an image step. The worker owns the page
    /// exclusively and writes back its new location and footer height.
    pub fn process_page(&self, page: &mut Page, footer: Option<&FooterRenderer>) -> Result<()> {
        debug_assert!(self.kind.is_image_step());

        let (img, metadata) = imaging::read_with_metadata(&page.image_path)?;

        let (img, band_height) = match self.kind {
            StepKind::ImageCopy | StepKind::ImageScale => (img, None),
            StepKind::ImageFooter | StepKind::ImageFooterGranular => {
                let renderer = footer.ok_or_else(|| {
                    Error::Image("footer step without a configured band".to_string())
                })?;
                let granular = if self.kind == StepKind::ImageFooterGranular {
                    page.identifier.as_deref()
                } else {
                    None
                };
                let (composite, band_h) =
                    renderer.brand(&page.file_pointer, &img, granular)?;
                (composite, Some(band_h))
            }
            StepKind::Pdf | StepKind::Enrich => unreachable!("not an image step"),
        };

        let (img, ratio) = imaging::handle_maximal(img, self.maximal);

        // The footer band must stay readable after downstream scaling.
        let footer_height = band_height.or(page.footer_height);
        let footer_height = match footer_height {
            Some(h) => {
                let scaled = (h as f32 * ratio).round() as u32;
                if scaled < MIN_FOOTER_HEIGHT {
                    return Err(Error::Image(format!(
                        "page {}: footer band reduced to {} px (minimum {})",
                        page.file_pointer, scaled, MIN_FOOTER_HEIGHT
                    )));
                }
                Some(scaled)
            }
            None => None,
        };

        let out = self.output_path(page);
        imaging::write_jpeg(&img, &out, self.quality, &metadata)?;

        page.image_path = out;
        if footer_height.is_some() {
            page.footer_height = footer_height;
        }
        Ok(())
    }
}
