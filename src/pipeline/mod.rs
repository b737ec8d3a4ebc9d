//! Derivation pipeline: ordered typed steps over a bounded worker pool.
//!
//! Steps execute in declared order; image steps fan their pages out to a
//! rayon pool and act as a barrier, so the next step observes all outputs of
//! the previous one. A failing page cancels its step and aborts the run;
//! partial outputs stay on disk for inspection.

pub mod plan;
pub mod step;

use std::path::PathBuf;

use log::{info, warn};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::imaging::footer::FooterRenderer;
use crate::mets::{Enricher, MetadataStore, NOT_AVAILABLE};
use crate::model::Page;
use crate::pdf::{self, ComposerOptions};
use crate::structure::{build_structure_tree, StructureNode};

pub use plan::RunPlan;
pub use step::{Step, StepKind};

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Document identifier the outputs are keyed on
    pub identifier: String,
    /// Number of pages processed
    pub pages: usize,
    /// Number of executed steps
    pub steps: usize,
    /// Granular URNs seen while branding
    pub granulars: usize,
    /// Location of the composed PDF, when a Pdf step ran
    pub pdf_path: Option<PathBuf>,
}

/// Executes a run plan.
pub struct Pipeline {
    plan: RunPlan,
    agent_label: String,
}

impl Pipeline {
    /// Create a pipeline; `agent_label` names the tool in METS and PDF
    /// metadata (injected once at start).
    pub fn new(plan: RunPlan, agent_label: impl Into<String>) -> Self {
        Self {
            plan,
            agent_label: agent_label.into(),
        }
    }

    /// Execute all steps in declared order.
    pub fn run(&self) -> Result<RunSummary> {
        let workers = worker_count(self.plan.pool_size);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| Error::Config(format!("worker pool: {}", e)))?;
        info!(
            "running {} steps with {} workers",
            self.plan.steps.len(),
            workers
        );

        let mut store = match &self.plan.mets_path {
            Some(path) => Some(MetadataStore::open(path)?),
            None => None,
        };

        // Descriptive data falls back to the holding name for METS-less runs.
        let mut descriptive = store
            .as_ref()
            .map(|s| s.descriptive())
            .unwrap_or_default();
        let holding = self.plan.holding_name();
        if descriptive.identifier == NOT_AVAILABLE {
            descriptive.identifier = holding.clone();
        }
        if descriptive.title == NOT_AVAILABLE {
            descriptive.title = holding;
        }
        let identifier = descriptive.identifier.clone();

        let mut pages = match &store {
            Some(s) => s.page_sequence(&self.plan.image_dir)?,
            None => pages_from_dir(&self.plan.image_dir)?,
        };
        if pages.is_empty() {
            return Err(Error::InputMissing(format!(
                "no pages found in {}",
                self.plan.image_dir.display()
            )));
        }

        let footer = if self.plan.steps.iter().any(|s| {
            matches!(
                s.kind,
                StepKind::ImageFooter | StepKind::ImageFooterGranular
            )
        }) {
            Some(FooterRenderer::new(&self.plan.footer_template)?)
        } else {
            None
        };

        let mut pdf_path = None;
        for (index, step) in self.plan.steps.iter().enumerate() {
            info!(
                "step {}/{}: {:?} -> {}",
                index + 1,
                self.plan.steps.len(),
                step.kind,
                step.output_dir.display()
            );

            match step.kind {
                StepKind::Pdf => {
                    let tree = self.outline_tree(store.as_ref(), &descriptive.title)?;
                    let out = self.plan.pdf_path(&identifier);
                    let options = ComposerOptions {
                        conformance: self.plan.conformance,
                        font_size_seed: self.plan.font_size_seed,
                        producer: self.agent_label.clone(),
                    };
                    pdf::compose(
                        &mut pages,
                        &descriptive,
                        tree.as_ref(),
                        self.plan.fulltext_dir.as_deref(),
                        &out,
                        &options,
                    )?;
                    pdf_path = Some(out);
                }
                StepKind::Enrich => {
                    let store = store.as_mut().ok_or_else(|| {
                        Error::Config("enrich step requires a METS file".to_string())
                    })?;
                    Enricher::new(self.agent_label.as_str()).enrich(store, &identifier)?;
                }
                _ => {
                    std::fs::create_dir_all(&step.output_dir)?;
                    // Every page is owned by exactly one worker; the step is
                    // a barrier and surfaces the first page error.
                    pool.install(|| {
                        pages
                            .par_iter_mut()
                            .map(|page| step.process_page(page, footer.as_ref()))
                            .collect::<Result<Vec<()>>>()
                    })?;
                }
            }
        }

        Ok(RunSummary {
            identifier,
            pages: pages.len(),
            steps: self.plan.steps.len(),
            granulars: footer.map(|f| f.granulars_seen()).unwrap_or(0),
            pdf_path,
        })
    }

    /// Build the outline tree, honouring the optional-outline setting.
    fn outline_tree(
        &self,
        store: Option<&MetadataStore>,
        fallback_title: &str,
    ) -> Result<Option<StructureNode>> {
        let Some(store) = store else {
            return Ok(None);
        };
        match build_structure_tree(store, fallback_title, self.plan.page_leaves) {
            Ok(tree) => Ok(Some(tree)),
            Err(e) if self.plan.outline_optional => {
                warn!("composing without an outline: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Effective parallelism: `min(configured, cores - 1)`, at least one.
pub fn worker_count(configured: usize) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2);
    configured.min(cores.saturating_sub(1)).max(1)
}

/// Page list for a plain image directory, ordered by file name.
fn pages_from_dir(dir: &std::path::Path) -> Result<Vec<Page>> {
    let pages = plan::list_images(dir)?
        .into_iter()
        .enumerate()
        .map(|(index, path)| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Page::new(index as u32 + 1, name, path)
        })
        .collect();
    Ok(pages)
}
