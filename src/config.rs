//! Run configuration.
//!
//! Configuration is file-based (JSON). Everything has a default, so a run
//! without a config file produces the standard derivative set.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::pdf::PdfALevel;

/// Default JPEG quality for derivative encoding.
const DEFAULT_QUALITY: u8 = 80;

/// Default worker count (before the core cap is applied).
const DEFAULT_POOLSIZE: usize = 2;

/// Default OCR font-size seed in points.
const DEFAULT_FONT_SIZE: u32 = 8;

/// Top-level run configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Worker count; capped at `cores - 1` at run time
    pub poolsize: usize,
    /// JPEG quality, 1..=100
    pub quality: u8,
    /// Maximum image dimension; 0 disables scaling
    pub maximal: u32,
    /// Footer band settings
    pub footer: FooterConfig,
    /// PDF settings
    pub pdf: PdfConfig,
    /// Ordered step declarations; empty means the default plan
    pub steps: Vec<StepConfig>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            poolsize: DEFAULT_POOLSIZE,
            quality: DEFAULT_QUALITY,
            maximal: 0,
            footer: FooterConfig::default(),
            pdf: PdfConfig::default(),
            steps: Vec::new(),
        }
    }
}

/// Footer band settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FooterConfig {
    /// Multi-line band template
    pub template: String,
}

impl Default for FooterConfig {
    fn default() -> Self {
        Self {
            template: "Universitäts- und Landesbibliothek Sachsen-Anhalt".to_string(),
        }
    }
}

/// PDF settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PdfConfig {
    /// PDF/A conformance tag (e.g. `PDF_A_1B`); absent means plain PDF
    pub conformance: Option<String>,
    /// OCR text font-size seed
    pub font_size: Option<u32>,
    /// Continue without an outline when structure mapping fails
    pub optional_outline: bool,
    /// Attach plain page leaves below outline divisions
    pub page_leaves: bool,
}

/// One declared pipeline step.
#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    /// Step kind
    pub kind: StepKindConfig,
    /// Output directory name under the work root; defaults per kind
    #[serde(default)]
    pub output_subdir: Option<String>,
    /// Step-local JPEG quality override
    #[serde(default)]
    pub quality: Option<u8>,
    /// Step-local maximal override
    #[serde(default)]
    pub maximal: Option<u32>,
}

/// Step kinds accepted in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKindConfig {
    /// Re-encode only
    ImageCopy,
    /// Re-encode with a maximum dimension
    ImageScale,
    /// Footer band without granular URNs
    ImageFooter,
    /// Footer band with per-page granular URNs
    ImageFooterGranular,
    /// Compose the PDF
    Pdf,
    /// Enrich the METS file
    Enrich,
}

impl StepKindConfig {
    /// Default output directory name for image steps.
    pub fn default_subdir(&self) -> &'static str {
        match self {
            StepKindConfig::ImageCopy => "IMAGE",
            StepKindConfig::ImageScale => "IMAGE_SCALED",
            StepKindConfig::ImageFooter | StepKindConfig::ImageFooterGranular => "IMAGE_FOOTER",
            StepKindConfig::Pdf | StepKindConfig::Enrich => "",
        }
    }

    /// Whether the step transforms page images.
    pub fn is_image_step(&self) -> bool {
        !matches!(self, StepKindConfig::Pdf | StepKindConfig::Enrich)
    }
}

impl RunConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: RunConfig = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate ranges and tags; called before any work begins.
    pub fn validate(&self) -> Result<()> {
        for quality in std::iter::once(self.quality)
            .chain(self.steps.iter().filter_map(|s| s.quality))
        {
            if !(1..=100).contains(&quality) {
                return Err(Error::Config(format!(
                    "quality {} out of range 1..=100",
                    quality
                )));
            }
        }
        self.conformance_level()?;
        Ok(())
    }

    /// Parsed PDF/A level, if configured.
    pub fn conformance_level(&self) -> Result<Option<PdfALevel>> {
        self.pdf
            .conformance
            .as_deref()
            .map(PdfALevel::from_tag)
            .transpose()
    }

    /// Effective OCR font-size seed.
    pub fn font_size_seed(&self) -> f32 {
        self.pdf.font_size.unwrap_or(DEFAULT_FONT_SIZE) as f32
    }

    /// The declared steps, or the default plan: granular footer branding,
    /// then the PDF (enrichment is appended by the planner when a METS file
    /// is present).
    pub fn effective_steps(&self) -> Vec<StepConfig> {
        if !self.steps.is_empty() {
            return self.steps.clone();
        }
        vec![
            StepConfig {
                kind: StepKindConfig::ImageFooterGranular,
                output_subdir: None,
                quality: None,
                maximal: None,
            },
            StepConfig {
                kind: StepKindConfig::Pdf,
                output_subdir: None,
                quality: None,
                maximal: None,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.poolsize, 2);
        assert_eq!(config.quality, 80);
        assert_eq!(config.maximal, 0);
        assert!(config.validate().is_ok());
        assert!(config.conformance_level().unwrap().is_none());
        let steps = config.effective_steps();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].kind, StepKindConfig::ImageFooterGranular);
        assert_eq!(steps[1].kind, StepKindConfig::Pdf);
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "poolsize": 4,
            "quality": 70,
            "maximal": 2339,
            "footer": { "template": "Zeile 1\nZeile 2" },
            "pdf": { "conformance": "PDF_A_1B", "font_size": 10 },
            "steps": [
                { "kind": "image_scale", "output_subdir": "IMAGE_80", "maximal": 2339 },
                { "kind": "image_footer_granular" },
                { "kind": "pdf" },
                { "kind": "enrich" }
            ]
        }"#;
        let config: RunConfig = serde_json::from_str(json).expect("parses");
        config.validate().expect("valid");
        assert_eq!(config.poolsize, 4);
        assert_eq!(config.footer.template, "Zeile 1\nZeile 2");
        assert_eq!(
            config.conformance_level().unwrap(),
            Some(PdfALevel::A1b)
        );
        assert_eq!(config.font_size_seed(), 10.0);
        assert_eq!(config.steps.len(), 4);
        assert_eq!(config.steps[0].maximal, Some(2339));
    }

    #[test]
    fn test_quality_out_of_range() {
        let config = RunConfig {
            quality: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let json = r#"{ "steps": [ { "kind": "image_copy", "quality": 101 } ] }"#;
        let config: RunConfig = serde_json::from_str(json).expect("parses");
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_conformance_tag() {
        let config = RunConfig {
            pdf: PdfConfig {
                conformance: Some("PDF_B_9Z".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_step_kind_names() {
        let step: StepConfig =
            serde_json::from_str(r#"{ "kind": "image_footer_granular" }"#).expect("parses");
        assert_eq!(step.kind, StepKindConfig::ImageFooterGranular);
        assert_eq!(step.kind.default_subdir(), "IMAGE_FOOTER");
        assert!(step.kind.is_image_step());
        assert!(!StepKindConfig::Enrich.is_image_step());
    }
}
