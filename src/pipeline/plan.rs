//! Run-plan assembly: input detection plus step wiring.
//!
//! A run starts from either a METS file or a holding directory. The planner
//! locates the image directory (commonly `MAX/` or `TIF/`), the optional
//! `FULLTEXT/` directory of ALTO files, and chains the declared steps so
//! that each step reads its predecessor's output directory.

use std::path::{Path, PathBuf};

use log::debug;

use crate::config::{RunConfig, StepConfig, StepKindConfig};
use crate::error::{Error, Result};
use crate::pdf::PdfALevel;

use super::step::{Step, StepKind};

/// Image directory names tried in order.
const IMAGE_DIR_CANDIDATES: [&str; 5] = ["MAX", "TIF", "TIFF", "DEFAULT", "IMAGE"];

/// Fulltext directory names tried in order.
const FULLTEXT_DIR_CANDIDATES: [&str; 2] = ["FULLTEXT", "fulltext"];

/// Image file extensions the planner recognises.
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "tif", "tiff"];

/// Everything a run needs, immutable after assembly.
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Work root; derivative directories and the PDF land here
    pub root: PathBuf,
    /// METS file, when the input provides one
    pub mets_path: Option<PathBuf>,
    /// Source image directory
    pub image_dir: PathBuf,
    /// ALTO directory, when present
    pub fulltext_dir: Option<PathBuf>,
    /// Steps in execution order
    pub steps: Vec<Step>,
    /// Configured worker count (capped at run time)
    pub pool_size: usize,
    /// Footer band template
    pub footer_template: String,
    /// PDF/A level, when requested
    pub conformance: Option<PdfALevel>,
    /// OCR font-size seed
    pub font_size_seed: f32,
    /// Continue without an outline when structure mapping fails
    pub outline_optional: bool,
    /// Attach plain page leaves below outline divisions
    pub page_leaves: bool,
}

impl RunPlan {
    /// Build the plan for an input path (METS file or holding directory).
    pub fn build(input: &Path, config: &RunConfig) -> Result<Self> {
        config.validate()?;

        let (root, mets_path) = if input.is_file() {
            let root = input
                .parent()
                .map(Path::to_path_buf)
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| PathBuf::from("."));
            (root, Some(input.to_path_buf()))
        } else if input.is_dir() {
            (input.to_path_buf(), detect_mets(input))
        } else {
            return Err(Error::InputMissing(format!(
                "{} is neither a file nor a directory",
                input.display()
            )));
        };

        let image_dir = detect_image_dir(&root)?;
        let fulltext_dir = FULLTEXT_DIR_CANDIDATES
            .iter()
            .map(|name| root.join(name))
            .find(|p| p.is_dir());
        debug!(
            "planned run: root {}, images {}, mets {:?}",
            root.display(),
            image_dir.display(),
            mets_path
        );

        let mut declared = config.effective_steps();
        // The default plan registers the PDF in the METS file when there is
        // one to enrich.
        if config.steps.is_empty() && mets_path.is_some() {
            declared.push(StepConfig {
                kind: StepKindConfig::Enrich,
                output_subdir: None,
                quality: None,
                maximal: None,
            });
        }

        let steps = chain_steps(&root, &image_dir, &declared, config);

        Ok(Self {
            root,
            mets_path,
            image_dir,
            fulltext_dir,
            steps,
            pool_size: config.poolsize,
            footer_template: config.footer.template.clone(),
            conformance: config.conformance_level()?,
            font_size_seed: config.font_size_seed(),
            outline_optional: config.pdf.optional_outline,
            page_leaves: config.pdf.page_leaves,
        })
    }

    /// Name of the holding, derived from the work root.
    pub fn holding_name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "derivative".to_string())
    }

    /// Location of the PDF for the given identifier.
    pub fn pdf_path(&self, identifier: &str) -> PathBuf {
        self.root.join(format!("{}.pdf", identifier))
    }
}

/// Wire the declared steps so step *i*'s output feeds step *i+1*.
fn chain_steps(
    root: &Path,
    image_dir: &Path,
    declared: &[StepConfig],
    config: &RunConfig,
) -> Vec<Step> {
    let mut steps = Vec::with_capacity(declared.len());
    let mut current_input = image_dir.to_path_buf();

    for sc in declared {
        let kind = match sc.kind {
            StepKindConfig::ImageCopy => StepKind::ImageCopy,
            StepKindConfig::ImageScale => StepKind::ImageScale,
            StepKindConfig::ImageFooter => StepKind::ImageFooter,
            StepKindConfig::ImageFooterGranular => StepKind::ImageFooterGranular,
            StepKindConfig::Pdf => StepKind::Pdf,
            StepKindConfig::Enrich => StepKind::Enrich,
        };

        if kind.is_image_step() {
            let subdir = sc
                .output_subdir
                .clone()
                .unwrap_or_else(|| sc.kind.default_subdir().to_string());
            let output_dir = root.join(subdir);
            steps.push(Step {
                kind,
                input_dir: current_input.clone(),
                output_dir: output_dir.clone(),
                quality: sc.quality.unwrap_or(config.quality),
                maximal: sc.maximal.unwrap_or(config.maximal),
            });
            current_input = output_dir;
        } else {
            steps.push(Step {
                kind,
                input_dir: current_input.clone(),
                output_dir: current_input.clone(),
                quality: sc.quality.unwrap_or(config.quality),
                maximal: 0,
            });
        }
    }
    steps
}

/// Locate the METS file of a holding directory: `<dir>/<dirname>.xml`, or
/// the single top-level XML file.
fn detect_mets(root: &Path) -> Option<PathBuf> {
    if let Some(name) = root.file_name() {
        let named = root.join(format!("{}.xml", name.to_string_lossy()));
        if named.is_file() {
            return Some(named);
        }
    }
    let mut xml_files: Vec<PathBuf> = std::fs::read_dir(root)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("xml")
        })
        .collect();
    if xml_files.len() == 1 {
        xml_files.pop()
    } else {
        None
    }
}

/// Locate the image directory under the work root.
fn detect_image_dir(root: &Path) -> Result<PathBuf> {
    for name in IMAGE_DIR_CANDIDATES {
        let candidate = root.join(name);
        if candidate.is_dir() && has_images(&candidate) {
            return Ok(candidate);
        }
    }
    // Any other direct subdirectory with images.
    if let Ok(entries) = std::fs::read_dir(root) {
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() && has_images(&path) {
                return Ok(path);
            }
        }
    }
    if has_images(root) {
        return Ok(root.to_path_buf());
    }
    Err(Error::InputMissing(format!(
        "no image directory found under {}",
        root.display()
    )))
}

/// Whether a directory contains at least one recognised page image.
pub fn has_images(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries.filter_map(|e| e.ok()).any(|e| {
                let path = e.path();
                path.is_file()
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                        .unwrap_or(false)
            })
        })
        .unwrap_or(false)
}

/// List the page images of a directory in name order.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                    .unwrap_or(false)
        })
        .collect();
    images.sort();
    if images.is_empty() {
        return Err(Error::InputMissing(format!(
            "no images in {}",
            dir.display()
        )));
    }
    Ok(images)
}
