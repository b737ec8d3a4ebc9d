//! PDF/A conformance levels.

use std::fmt;

use crate::error::{Error, Result};

/// PDF/A conformance level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PdfALevel {
    /// PDF/A-1a: full conformance with logical structure
    A1a,
    /// PDF/A-1b: basic conformance (visual preservation)
    A1b,
    /// PDF/A-2a: PDF 1.7 based, full conformance
    A2a,
    /// PDF/A-2b: PDF 1.7 based, basic conformance
    A2b,
    /// PDF/A-2u: PDF/A-2b plus Unicode mapping
    A2u,
    /// PDF/A-3a: PDF/A-2a plus embedded files
    A3a,
    /// PDF/A-3b: PDF/A-2b plus embedded files
    A3b,
    /// PDF/A-3u: PDF/A-3b plus Unicode mapping
    A3u,
}

impl PdfALevel {
    /// Parse a configuration tag such as `PDF_A_1B` or `PDF_A_2A`.
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag.to_ascii_uppercase().as_str() {
            "PDF_A_1A" => Ok(PdfALevel::A1a),
            "PDF_A_1B" => Ok(PdfALevel::A1b),
            "PDF_A_2A" => Ok(PdfALevel::A2a),
            "PDF_A_2B" => Ok(PdfALevel::A2b),
            "PDF_A_2U" => Ok(PdfALevel::A2u),
            "PDF_A_3A" => Ok(PdfALevel::A3a),
            "PDF_A_3B" => Ok(PdfALevel::A3b),
            "PDF_A_3U" => Ok(PdfALevel::A3u),
            other => Err(Error::Config(format!("unknown conformance tag {}", other))),
        }
    }

    /// Get the XMP `pdfaid:part` value.
    pub fn xmp_part(&self) -> &'static str {
        match self {
            PdfALevel::A1a | PdfALevel::A1b => "1",
            PdfALevel::A2a | PdfALevel::A2b | PdfALevel::A2u => "2",
            PdfALevel::A3a | PdfALevel::A3b | PdfALevel::A3u => "3",
        }
    }

    /// Get the XMP `pdfaid:conformance` value.
    pub fn xmp_conformance(&self) -> &'static str {
        match self {
            PdfALevel::A1a | PdfALevel::A2a | PdfALevel::A3a => "A",
            PdfALevel::A1b | PdfALevel::A2b | PdfALevel::A3b => "B",
            PdfALevel::A2u | PdfALevel::A3u => "U",
        }
    }

    /// PDF version the part is based on.
    pub fn pdf_version(&self) -> &'static str {
        match self.xmp_part() {
            "1" => "1.4",
            _ => "1.7",
        }
    }
}

impl fmt::Display for PdfALevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PDF/A-{}{}", self.xmp_part(), self.xmp_conformance().to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_tags() {
        assert_eq!(PdfALevel::from_tag("PDF_A_1B").unwrap(), PdfALevel::A1b);
        assert_eq!(PdfALevel::from_tag("pdf_a_2a").unwrap(), PdfALevel::A2a);
        assert_eq!(PdfALevel::from_tag("PDF_A_3U").unwrap(), PdfALevel::A3u);
    }

    #[test]
    fn test_unknown_tag_is_config_error() {
        let err = PdfALevel::from_tag("PDF_X_4").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_parts_and_versions() {
        assert_eq!(PdfALevel::A1b.xmp_part(), "1");
        assert_eq!(PdfALevel::A1b.pdf_version(), "1.4");
        assert_eq!(PdfALevel::A2b.pdf_version(), "1.7");
        assert_eq!(PdfALevel::A2u.xmp_conformance(), "U");
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", PdfALevel::A1b), "PDF/A-1b");
        assert_eq!(format!("{}", PdfALevel::A2a), "PDF/A-2a");
    }
}
