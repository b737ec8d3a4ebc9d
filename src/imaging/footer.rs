//! Footer branding: a pre-rendered band appended below every page image.
//!
//! The band carries the configured template text (multi-line, centred) and,
//! when the page has one, its granular URN on an extra line below the
//! template block. The template part is rasterised once per run and cloned
//! per page.

use std::sync::atomic::{AtomicUsize, Ordering};

use ab_glyph::{FontRef, PxScale};
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use log::{debug, warn};

use crate::error::{Error, Result};
use crate::imaging;

/// Packaged monospace bold face used for band text.
const FONT_BYTES: &[u8] = include_bytes!("../../resources/DejaVuSansMono-Bold.ttf");

/// Reference width the base band is rendered at before per-page fitting.
const BAND_WIDTH: u32 = 2400;

/// Text height in pixels at reference width.
const FONT_PX: f32 = 42.0;

/// Vertical gap between band lines.
const LINE_GAP: u32 = 10;

/// Padding above the first and below the last line.
const PADDING: u32 = 18;

/// A band squeezed below this height by downstream scaling is unreadable
/// and fails the page.
pub const MIN_FOOTER_HEIGHT: u32 = 25;

/// Width-fit tolerance; bands within 2% of the page width are used as-is.
const WIDTH_FIT_TOLERANCE: f32 = 0.02;

/// Horizontal offset that centres `text` on the reference band.
fn centered_x(font: &FontRef<'_>, scale: PxScale, text: &str) -> i32 {
    let (text_w, _) = text_size(scale, font, text);
    let free = (BAND_WIDTH as i64 - text_w as i64).max(0);
    (free / 2) as i32
}

/// Renders footer bands for one run.
pub struct FooterRenderer {
    font: FontRef<'static>,
    base: RgbImage,
    /// Baseline row of the granular URN slot, below the template block
    granular_row: u32,
    granulars_seen: AtomicUsize,
}

impl FooterRenderer {
    /// Pre-render the base band from a (possibly multi-line) template.
    pub fn new(template: &str) -> Result<Self> {
        let font = FontRef::try_from_slice(FONT_BYTES)
            .map_err(|e| Error::Image(format!("footer font unusable: {}", e)))?;

        let lines: Vec<&str> = template.lines().filter(|l| !l.trim().is_empty()).collect();
        let line_height = FONT_PX.ceil() as u32 + LINE_GAP;
        // Template block plus one reserved line for the granular URN, so
        // every page of a run gets a band of identical height.
        let height = PADDING * 2 + line_height * (lines.len() as u32 + 1);

        let mut base = RgbImage::from_pixel(BAND_WIDTH, height, Rgb([255, 255, 255]));
        let scale = PxScale::from(FONT_PX);
        let mut row = PADDING;
        for line in &lines {
            let x = centered_x(&font, scale, line);
            draw_text_mut(&mut base, Rgb([0, 0, 0]), x, row as i32, scale, &font, line);
            row += line_height;
        }

        Ok(Self {
            font,
            base,
            granular_row: row,
            granulars_seen: AtomicUsize::new(0),
        })
    }

    /// Height of the un-fitted band in pixels.
    pub fn band_height(&self) -> u32 {
        self.base.height()
    }

    /// Number of granular URNs rendered so far in this run.
    pub fn granulars_seen(&self) -> usize {
        self.granulars_seen.load(Ordering::Relaxed)
    }

    /// Brand one page: append the band, return the composite and the band
    /// height it contributed.
    ///
    /// `granular` is the page URN to print on the reserved line; pages
    /// without one get the plain template band and a warning.
    pub fn brand(
        &self,
        page_name: &str,
        image: &DynamicImage,
        granular: Option<&str>,
    ) -> Result<(DynamicImage, u32)> {
        let mut band = self.base.clone();

        match granular {
            Some(urn) => {
                let scale = PxScale::from(FONT_PX);
                let x = centered_x(&self.font, scale, urn);
                draw_text_mut(
                    &mut band,
                    Rgb([0, 0, 0]),
                    x,
                    self.granular_row as i32,
                    scale,
                    &self.font,
                    urn,
                );
                self.granulars_seen.fetch_add(1, Ordering::Relaxed);
            }
            None => warn!("page {} carries no granular URN", page_name),
        }

        let image_w = image.width();
        let fit = band.width() as f32 / image_w as f32;
        let band = if (1.0 - fit).abs() > WIDTH_FIT_TOLERANCE {
            debug!(
                "page {}: fitting footer band {} -> {} px wide",
                page_name,
                band.width(),
                image_w
            );
            image::imageops::resize(&band, image_w, band.height(), FilterType::Lanczos3)
        } else {
            band
        };

        let band_height = band.height();
        let composite = imaging::append(image, &DynamicImage::ImageRgb8(band));
        Ok((composite, band_height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "Universitäts- und Landesbibliothek\nDigitale Sammlungen";

    fn renderer() -> FooterRenderer {
        FooterRenderer::new(TEMPLATE).expect("band renders")
    }

    fn page(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([230, 230, 230])))
    }

    #[test]
    fn test_base_band_height_covers_template_and_granular_slot() {
        let r = renderer();
        // Two template lines plus the reserved granular line.
        let line_height = FONT_PX.ceil() as u32 + LINE_GAP;
        assert_eq!(r.band_height(), PADDING * 2 + line_height * 3);
    }

    #[test]
    fn test_brand_appends_band_below_image() {
        let r = renderer();
        let (out, band_h) = r
            .brand("p0001", &page(BAND_WIDTH, 1000), Some("urn:nbn:de:gbv:3:3-21437-p0001-0"))
            .expect("brand");
        assert_eq!(out.height(), 1000 + band_h);
        assert_eq!(out.width(), BAND_WIDTH);
        assert_eq!(r.granulars_seen(), 1);
    }

    #[test]
    fn test_brand_without_granular_counts_nothing() {
        let r = renderer();
        let (out, band_h) = r.brand("p0002", &page(BAND_WIDTH, 500), None).expect("brand");
        assert_eq!(r.granulars_seen(), 0);
        assert_eq!(out.height(), 500 + band_h);
    }

    #[test]
    fn test_band_is_fitted_to_narrow_pages() {
        let r = renderer();
        let (out, band_h) = r.brand("p0003", &page(1200, 900), None).expect("brand");
        assert_eq!(out.width(), 1200);
        assert_eq!(out.height(), 900 + band_h);
        // Fitting is horizontal; the band keeps its height.
        assert_eq!(band_h, r.band_height());
    }

    #[test]
    fn test_band_within_tolerance_keeps_reference_width() {
        let r = renderer();
        // 1% narrower than the band: inside the 2% fit window.
        let (out, _) = r.brand("p0004", &page(BAND_WIDTH - 24, 800), None).expect("brand");
        assert_eq!(out.width(), BAND_WIDTH - 24);
    }

    #[test]
    fn test_band_text_is_actually_drawn() {
        let r = renderer();
        let dark = r
            .base
            .pixels()
            .filter(|p| p.0[0] < 128)
            .count();
        assert!(dark > 0, "template text should produce dark pixels");
    }
}
