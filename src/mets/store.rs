//! Read-only projections over a parsed METS/MODS document.
//!
//! The store owns the parsed tree and exposes three views: the descriptive
//! data of the primary MODS section, the physical page sequence, and (via
//! [`crate::structure`]) the logical outline tree. The enrichment pass
//! mutates the same tree through [`MetadataStore::tree_mut`].

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::model::Page;

use super::xml::{XmlElement, XmlTree};

/// Sentinel for descriptive fields the MODS section does not provide.
pub const NOT_AVAILABLE: &str = "n.a.";

/// Descriptive metadata of the digitised work.
#[derive(Debug, Clone)]
pub struct DescriptiveData {
    /// Work-level URN
    pub urn: String,
    /// Record identifier of the primary MODS section
    pub identifier: String,
    /// First title
    pub title: String,
    /// Display name of the author, or of the publisher when no author exists
    pub person: String,
    /// Year of publication; `"0"` when unknown
    pub year_published: String,
    /// Access condition text, if recorded
    pub license: Option<String>,
    /// Subject topics, if recorded
    pub keywords: Option<String>,
    /// Creator of the derivative, when supplied by configuration
    pub creator: Option<String>,
}

impl Default for DescriptiveData {
    fn default() -> Self {
        Self {
            urn: NOT_AVAILABLE.to_string(),
            identifier: NOT_AVAILABLE.to_string(),
            title: NOT_AVAILABLE.to_string(),
            person: NOT_AVAILABLE.to_string(),
            year_published: "0".to_string(),
            license: None,
            keywords: None,
            creator: None,
        }
    }
}

impl DescriptiveData {
    /// Set the publication year, coercing the sentinel to `"0"`.
    pub fn set_year_published(&mut self, year: impl Into<String>) {
        let year = year.into();
        self.year_published = if year == NOT_AVAILABLE { "0".to_string() } else { year };
    }
}

/// Parsed METS document plus its on-disk location.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    tree: XmlTree,
    path: PathBuf,
}

impl MetadataStore {
    /// Parse a METS file from disk.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::InputMissing(format!(
                "METS file {} does not exist",
                path.display()
            )));
        }
        let xml = std::fs::read_to_string(path)?;
        let tree = XmlTree::parse(&xml, &path.display().to_string())?;
        Ok(Self::from_tree(tree, path.to_path_buf()))
    }

    /// Wrap an already parsed tree.
    pub fn from_tree(tree: XmlTree, path: PathBuf) -> Self {
        Self { tree, path }
    }

    /// Location the document was read from (and is written back to).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The underlying document tree.
    pub fn tree(&self) -> &XmlTree {
        &self.tree
    }

    /// Mutable access for the enrichment pass.
    pub fn tree_mut(&mut self) -> &mut XmlTree {
        &mut self.tree
    }

    /// Persist the (possibly enriched) document over its source file.
    pub fn save(&self) -> Result<()> {
        let xml = self.tree.to_string()?;
        std::fs::write(&self.path, xml).map_err(|e| {
            Error::MetsWrite(format!("write {}: {}", self.path.display(), e))
        })
    }

    /// Root container of the logical structMap, when present.
    pub fn logical_root(&self) -> Option<&XmlElement> {
        self.tree
            .root
            .descendants()
            .into_iter()
            .find(|e| e.local_name() == "structMap" && e.attr("TYPE") == Some("LOGICAL"))
            .and_then(|sm| sm.child("div"))
    }

    /// Extract the descriptive projection from the primary MODS section.
    pub fn descriptive(&self) -> DescriptiveData {
        let mut data = DescriptiveData::default();
        let Some(mods) = self.primary_mods() else {
            return data;
        };

        if let Some(id) = mods
            .descendants_named("recordIdentifier")
            .into_iter()
            .find(|e| e.attr("source").is_some())
        {
            data.identifier = id.text();
        }

        if let Some(urn) = mods
            .descendants_named("identifier")
            .into_iter()
            .find(|e| e.attr("type") == Some("urn"))
        {
            data.urn = urn.text();
        }

        if let Some(title) = mods
            .descendants_named("titleInfo")
            .into_iter()
            .find_map(|ti| ti.child("title"))
        {
            data.title = title.text();
        }

        if let Some(person) = person_display_name(mods) {
            data.person = person;
        }

        if let Some(license) = mods.descendant("accessCondition") {
            let text = license.text();
            if !text.is_empty() {
                data.license = Some(text);
            }
        }

        let topics: Vec<String> = mods
            .descendants_named("subject")
            .into_iter()
            .flat_map(|s| s.descendants_named("topic"))
            .map(|t| t.text())
            .filter(|t| !t.is_empty())
            .collect();
        if !topics.is_empty() {
            data.keywords = Some(topics.join(", "));
        }

        data.set_year_published(year_published(mods));
        data
    }

    /// The physical page sequence, with images resolved against `image_dir`.
    ///
    /// Pages come back 1-based and contiguous in physical order; the granular
    /// URN of a page is its `CONTENTIDS`.
    pub fn page_sequence(&self, image_dir: &Path) -> Result<Vec<Page>> {
        let source = self.path.display().to_string();
        let physical = self
            .tree
            .root
            .descendants()
            .into_iter()
            .find(|e| e.local_name() == "structMap" && e.attr("TYPE") == Some("PHYSICAL"))
            .ok_or_else(|| Error::Parse {
                source_file: source.clone(),
                reason: "no physical structMap".to_string(),
            })?;

        let mut entries: Vec<(u32, &XmlElement)> = Vec::new();
        for div in physical.descendants_named("div") {
            if div.attr("TYPE") != Some("page") {
                continue;
            }
            let order = div
                .attr("ORDER")
                .and_then(|o| o.parse::<u32>().ok())
                .ok_or_else(|| Error::Parse {
                    source_file: source.clone(),
                    reason: format!(
                        "physical div {} lacks a numeric ORDER",
                        div.attr("ID").unwrap_or("<no id>")
                    ),
                })?;
            entries.push((order, div));
        }
        entries.sort_by_key(|(order, _)| *order);

        let mut pages = Vec::with_capacity(entries.len());
        for (index, (_, div)) in entries.into_iter().enumerate() {
            let file_id = div
                .descendant("fptr")
                .and_then(|f| f.attr("FILEID"))
                .ok_or_else(|| Error::Parse {
                    source_file: source.clone(),
                    reason: format!(
                        "physical div {} has no fptr",
                        div.attr("ID").unwrap_or("<no id>")
                    ),
                })?;
            let file_name = self.resolve_file(file_id).ok_or_else(|| Error::Parse {
                source_file: source.clone(),
                reason: format!("file {} not found in MAX/DEFAULT file group", file_id),
            })?;

            let mut page = Page::new(
                index as u32 + 1,
                file_name.clone(),
                image_dir.join(&file_name),
            );
            page.identifier = div.attr("CONTENTIDS").map(|s| s.to_string());
            pages.push(page);
        }
        Ok(pages)
    }

    /// Resolve a FILEID to the original basename via the MAX file group,
    /// falling back to DEFAULT.
    fn resolve_file(&self, file_id: &str) -> Option<String> {
        for use_attr in ["MAX", "DEFAULT"] {
            let group = self
                .tree
                .root
                .descendants()
                .into_iter()
                .find(|e| e.local_name() == "fileGrp" && e.attr("USE") == Some(use_attr));
            if let Some(group) = group {
                if let Some(href) = group
                    .descendants_named("file")
                    .into_iter()
                    .find(|f| f.attr("ID") == Some(file_id))
                    .and_then(|f| f.child("FLocat"))
                    .and_then(|l| l.attr("href"))
                {
                    let base = href.rsplit('/').next().unwrap_or(href);
                    return Some(base.to_string());
                }
            }
        }
        None
    }

    /// The MODS section linked from the logical root container via DMDID,
    /// falling back to the first subdiv carrying a DMDID (multivolume works),
    /// then to the first MODS section in the document.
    fn primary_mods(&self) -> Option<&XmlElement> {
        let dmd_id = self.logical_root().and_then(|root| {
            root.attr("DMDID").map(|s| s.to_string()).or_else(|| {
                root.descendants_named("div")
                    .into_iter()
                    .find_map(|d| d.attr("DMDID").map(|s| s.to_string()))
            })
        });

        if let Some(dmd_id) = dmd_id {
            if let Some(mods) = self
                .tree
                .root
                .descendants()
                .into_iter()
                .find(|e| e.local_name() == "dmdSec" && e.attr("ID") == Some(dmd_id.as_str()))
                .and_then(|sec| sec.descendant("mods"))
            {
                return Some(mods);
            }
        }
        self.tree.root.descendant("mods")
    }
}

/// Display name per the MARC relator rules: prefer the first name with role
/// code `aut`, else the first with `pbl`; within the chosen name prefer
/// `displayForm` over the family name part.
fn person_display_name(mods: &XmlElement) -> Option<String> {
    let names = mods.descendants_named("name");
    let by_role = |code: &str| {
        names.iter().find(|name| {
            name.descendants_named("roleTerm").into_iter().any(|term| {
                term.attr("type") == Some("code") && term.text() == code
            })
        })
    };

    let chosen = by_role("aut").or_else(|| by_role("pbl"))?;
    if let Some(display) = chosen.child("displayForm") {
        let text = display.text();
        if !text.is_empty() {
            return Some(text);
        }
    }
    chosen
        .descendants_named("namePart")
        .into_iter()
        .find(|p| p.attr("type") == Some("family"))
        .map(|p| p.text())
        .filter(|t| !t.is_empty())
}

/// Publication year: `originInfo[@eventType='publication']` preferred,
/// any `dateIssued` otherwise.
fn year_published(mods: &XmlElement) -> String {
    let origin_infos = mods.descendants_named("originInfo");
    let publication = origin_infos
        .iter()
        .find(|oi| oi.attr("eventType") == Some("publication"))
        .and_then(|oi| oi.child("dateIssued"));
    let any = origin_infos.iter().find_map(|oi| oi.child("dateIssued"));
    publication
        .or(any)
        .map(|d| d.text())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
