//! Page-level data model shared by all pipeline stages.
//!
//! A [`Page`] is created once from the physical METS sequence (or from a
//! plain directory listing) and then carried through every step: image steps
//! rewrite `image_path` and `footer_height`, the PDF step attaches and
//! consumes the OCR layer.

use std::path::PathBuf;

/// A single physical page of the digitised work.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based position in the physical sequence, unique within a run
    pub order: u32,
    /// Basename as recorded in METS before any derivation
    pub file_pointer: String,
    /// Current image location; rewritten by every image step
    pub image_path: PathBuf,
    /// Granular URN of this page, if the METS records one
    pub identifier: Option<String>,
    /// Height in pixels of the appended footer band, once branded
    pub footer_height: Option<u32>,
    /// OCR layer, attached lazily by the PDF step
    pub ocr: Option<OcrPage>,
}

impl Page {
    /// Create a page at the given sequence position.
    pub fn new(order: u32, file_pointer: impl Into<String>, image_path: PathBuf) -> Self {
        Self {
            order,
            file_pointer: file_pointer.into(),
            image_path,
            identifier: None,
            footer_height: None,
            ocr: None,
        }
    }

    /// Basename of the original file without its extension.
    ///
    /// Derivative steps key their outputs and the ALTO lookup on this stem.
    pub fn stem(&self) -> &str {
        self.file_pointer
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&self.file_pointer)
    }
}

/// OCR result for one page, in the coordinate system of the ALTO source.
#[derive(Debug, Clone)]
pub struct OcrPage {
    /// Page width in ALTO pixels
    pub page_width: u32,
    /// Page height in ALTO pixels
    pub page_height: u32,
    /// Text lines in reading order
    pub lines: Vec<TextLine>,
}

impl OcrPage {
    /// Scale the page box and every line by the same factor.
    ///
    /// Applied at most once per page, when the composed image height differs
    /// from the OCR height by more than 1%.
    pub fn scale(&mut self, ratio: f32) {
        self.page_width = scale_u32(self.page_width, ratio);
        self.page_height = scale_u32(self.page_height, ratio);
        for line in &mut self.lines {
            line.bounds = line.bounds.scale(ratio);
        }
    }
}

/// One recognised line of text with its pixel bounding box.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// Normalised single-line text content
    pub text: String,
    /// Bounding box in page pixels
    pub bounds: PixelBox,
}

/// Axis-aligned pixel rectangle, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width
    pub w: u32,
    /// Height
    pub h: u32,
}

impl PixelBox {
    /// Create a box from its components.
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Bottom edge (`y + h`).
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }

    /// Right edge (`x + w`).
    pub fn right(&self) -> u32 {
        self.x + self.w
    }

    /// Uniformly scaled copy.
    pub fn scale(&self, ratio: f32) -> Self {
        Self {
            x: scale_u32(self.x, ratio),
            y: scale_u32(self.y, ratio),
            w: scale_u32(self.w, ratio),
            h: scale_u32(self.h, ratio),
        }
    }

    /// Clamp this box into a `width x height` page.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Self {
            x,
            y,
            w: self.w.min(width - x),
            h: self.h.min(height - y),
        }
    }
}

fn scale_u32(value: u32, ratio: f32) -> u32 {
    (value as f32 * ratio).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_stem() {
        let page = Page::new(1, "737434.jpg", PathBuf::from("/tmp/737434.jpg"));
        assert_eq!(page.stem(), "737434");

        let page = Page::new(2, "noext", PathBuf::from("/tmp/noext"));
        assert_eq!(page.stem(), "noext");
    }

    #[test]
    fn test_box_edges() {
        let b = PixelBox::new(10, 20, 100, 30);
        assert_eq!(b.right(), 110);
        assert_eq!(b.bottom(), 50);
    }

    #[test]
    fn test_box_scale_rounds() {
        let b = PixelBox::new(10, 20, 101, 31).scale(0.5);
        assert_eq!(b, PixelBox::new(5, 10, 51, 16));
    }

    #[test]
    fn test_box_clamp() {
        let b = PixelBox::new(90, 90, 40, 40).clamp_to(100, 100);
        assert_eq!(b, PixelBox::new(90, 90, 10, 10));
    }

    #[test]
    fn test_ocr_scale_applies_to_all_lines() {
        let mut ocr = OcrPage {
            page_width: 2000,
            page_height: 3000,
            lines: vec![
                TextLine {
                    text: "erste Zeile".to_string(),
                    bounds: PixelBox::new(100, 200, 800, 40),
                },
                TextLine {
                    text: "zweite Zeile".to_string(),
                    bounds: PixelBox::new(100, 260, 600, 40),
                },
            ],
        };
        ocr.scale(0.5);
        assert_eq!(ocr.page_width, 1000);
        assert_eq!(ocr.page_height, 1500);
        assert_eq!(ocr.lines[0].bounds, PixelBox::new(50, 100, 400, 20));
        assert_eq!(ocr.lines[1].bounds, PixelBox::new(50, 130, 300, 20));
    }
}
