//! # quire
//!
//! Derivative generator for digitised library holdings.
//!
//! Given a directory of page images (JPEG or TIFF) and, optionally, a
//! METS/MODS file with per-page ALTO OCR, quire produces:
//!
//! - scaled and footer-branded JPEG derivative sets,
//! - one searchable PDF (optionally PDF/A) whose pages are the derivative
//!   images with an invisible OCR text layer and a hierarchical outline,
//! - an updated METS file referencing the PDF as a new file group.
//!
//! ## Quick start
//!
//! ```ignore
//! use quire::config::RunConfig;
//! use quire::pipeline::{Pipeline, RunPlan};
//!
//! # fn main() -> quire::error::Result<()> {
//! let config = RunConfig::default();
//! let plan = RunPlan::build(std::path::Path::new("737429"), &config)?;
//! let summary = Pipeline::new(plan, quire::agent_label()).run()?;
//! println!("{} pages -> {:?}", summary.pages, summary.pdf_path);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Shared page model
pub mod model;

// Run configuration
pub mod config;

// OCR input
pub mod alto;

// Image primitives and footer branding
pub mod imaging;

// METS/MODS parsing, projections and enrichment
pub mod mets;

// Logical structure mapping
pub mod structure;

// PDF assembly
pub mod pdf;

// Step execution
pub mod pipeline;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Tool label recorded in METS agent entries and PDF producer fields.
pub fn agent_label() -> String {
    format!("{} V{}", NAME, VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name() {
        assert_eq!(NAME, "quire");
    }

    #[test]
    fn test_agent_label_carries_version() {
        let label = agent_label();
        assert!(label.starts_with("quire V"));
        assert!(label.contains(VERSION));
    }
}
