//! PDF composition: pages, OCR text layer, outline, metadata.
//!
//! Consumes the final derivative images plus the METS projections and
//! produces one searchable document. Each page is sized to its image's pixel
//! dimensions (1 px = 1 PDF unit, zero margins); the OCR lines are placed
//! invisibly under the image with per-line font-size fitting.

use std::path::Path;

use log::{debug, info, warn};

use crate::alto;
use crate::error::{Error, Result};
use crate::mets::DescriptiveData;
use crate::model::{Page, PixelBox};
use crate::structure::StructureNode;

use super::conformance::PdfALevel;
use super::content::ContentStreamBuilder;
use super::font::{EmbeddedFont, TextFont, FONT_RESOURCE};
use super::image::ImageXObject;
use super::stamper;
use super::writer::{DocumentMetadata, DocumentPage, DocumentWriter, WrittenPdf};

/// Tolerated relative difference between image height and OCR height before
/// the OCR coordinates are rescaled.
const OCR_RATIO_TOLERANCE: f32 = 0.01;

/// Fitting decrements the font size in steps of this many points.
const FIT_STEP: f32 = 3.0;

/// Hard floor for fitted font sizes.
const MIN_FONT_SIZE: f32 = 1.0;

/// Composer settings.
#[derive(Debug, Clone)]
pub struct ComposerOptions {
    /// PDF/A level; switches on the embedded font and output intent
    pub conformance: Option<PdfALevel>,
    /// Fallback font size for lines without a usable height
    pub font_size_seed: f32,
    /// Producer string for info dictionary and XMP
    pub producer: String,
}

/// Compose the document at `output_path`.
///
/// OCR is attached lazily: pages without an [`crate::model::OcrPage`] get
/// their ALTO file (matched by stem) read from `fulltext_dir` first. Returns
/// the write summary; an incomplete result (missing pages, missing outline)
/// is an error.
pub fn compose(
    pages: &mut [Page],
    descriptive: &DescriptiveData,
    tree: Option<&StructureNode>,
    fulltext_dir: Option<&Path>,
    output_path: &Path,
    options: &ComposerOptions,
) -> Result<WrittenPdf> {
    if pages.is_empty() {
        return Err(Error::Pdf("no pages to compose".to_string()));
    }

    let mut font = match options.conformance {
        Some(_) => TextFont::Embedded(EmbeddedFont::packaged()?),
        None => TextFont::Builtin,
    };

    let metadata = DocumentMetadata {
        title: descriptive.title.clone(),
        author: descriptive.person.clone(),
        creator: descriptive.creator.clone(),
        keywords: descriptive.keywords.clone(),
        producer: options.producer.clone(),
    };
    let mut writer = DocumentWriter::new(metadata, options.conformance);

    for page in pages.iter_mut() {
        attach_ocr(page, fulltext_dir);

        let image = ImageXObject::from_jpeg_file(&page.image_path)?;
        let (width, height) = (image.width as f32, image.height as f32);

        let mut content = ContentStreamBuilder::new();
        if let Some(ocr) = page.ocr.as_mut() {
            // The branded image is taller than the OCR page by the band.
            let ocr_height = ocr.page_height + page.footer_height.unwrap_or(0);
            let ratio = height / ocr_height as f32;
            if (1.0 - ratio).abs() > OCR_RATIO_TOLERANCE {
                debug!(
                    "page {}: scaling OCR layer by {:.3}",
                    page.file_pointer, ratio
                );
                ocr.scale(ratio);
            }

            for line in &ocr.lines {
                let size = fit_font_size(&font, &line.text, &line.bounds, options.font_size_seed);
                let x = line.bounds.x as f32;
                let y = height - line.bounds.bottom() as f32 - size;
                let encoded = font.encode(&line.text);
                content.draw_hidden_text(FONT_RESOURCE, size, x, y, encoded);
            }
        }
        // Image over the text layer: the text stays in the under layer.
        content.draw_image("Im1", width, height);

        writer.add_page(DocumentPage {
            width,
            height,
            image,
            content,
        });
    }

    let page_count = pages.len();
    let written = writer.save(output_path, &font, tree)?;

    // Custom headers go through the in-place stamper after close.
    let mut extra: Vec<(String, String)> = Vec::new();
    if let Some(license) = &descriptive.license {
        extra.push(("Access condition".to_string(), license.clone()));
    }
    extra.push(("Published".to_string(), descriptive.year_published.clone()));
    stamper::merge_info(&written, &extra)?;

    if written.page_count != page_count {
        return Err(Error::Pdf(format!(
            "wrote {} of {} pages",
            written.page_count, page_count
        )));
    }
    if tree.is_some() && !written.outline_attached {
        return Err(Error::Pdf("outline could not be attached".to_string()));
    }

    info!(
        "composed {} with {} pages{}",
        output_path.display(),
        written.page_count,
        if written.outline_attached {
            " and outline"
        } else {
            ""
        }
    );
    Ok(written)
}

/// Attach the page's ALTO file, if one exists next to the images.
fn attach_ocr(page: &mut Page, fulltext_dir: Option<&Path>) {
    if page.ocr.is_some() {
        return;
    }
    let Some(dir) = fulltext_dir else {
        return;
    };
    let candidate = dir.join(format!("{}.xml", page.stem()));
    if !candidate.is_file() {
        return;
    }
    match alto::read_alto(&candidate) {
        Ok(ocr) => {
            debug!(
                "page {}: {} OCR lines from {}",
                page.file_pointer,
                ocr.lines.len(),
                candidate.display()
            );
            page.ocr = Some(ocr);
        }
        Err(e) => warn!("page {}: unusable ALTO: {}", page.file_pointer, e),
    }
}

/// Fit the font size for one line: start from the line height (or the seed
/// when the box is degenerate) and shrink in fixed steps until the rendered
/// width fits the box, with a floor of one point.
fn fit_font_size(font: &TextFont, text: &str, bounds: &PixelBox, seed: f32) -> f32 {
    let width_units = font.width_units(text);
    let mut size = if bounds.h > 0 { bounds.h as f32 } else { seed };
    if size < MIN_FONT_SIZE {
        return MIN_FONT_SIZE;
    }
    while width_units * size / 1000.0 > bounds.w as f32 && size > MIN_FONT_SIZE {
        size -= FIT_STEP;
    }
    size.max(MIN_FONT_SIZE)
}
