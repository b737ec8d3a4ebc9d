//! Logical outline mapping.
//!
//! Builds the outline tree of a digitised work from the logical structMap,
//! resolving each logical division to its first physical page through the
//! structLink section. Divisions whose type has no label fallback are
//! discarded; divisions without a resolvable link are pruned afterwards.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::mets::{MetadataStore, XmlElement};

/// Logical container types that span the whole work. Page leaves are never
/// attached beneath them: some source systems link every page to the top
/// container.
const TOP_LEVEL_TYPES: [&str; 3] = ["monograph", "volume", "multivolume_work"];

/// Sentinel page for divisions the structLink section does not resolve.
const UNRESOLVED: i32 = -1;

/// One node of the outline tree. After mapping, every node's `page` is a
/// valid 1-based page number.
#[derive(Debug, Clone)]
pub struct StructureNode {
    /// Outline label
    pub label: String,
    /// 1-based page the node points at
    pub page: i32,
    /// Sub-divisions in reading order
    pub children: Vec<StructureNode>,
}

impl StructureNode {
    /// Total number of nodes including self.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(StructureNode::count).sum::<usize>()
    }
}

/// Fixed localisation of the logical type vocabulary. Types outside this
/// dictionary cannot label a node and cause it to be discarded.
fn localize_type(logical_type: &str) -> Option<&'static str> {
    match logical_type {
        "cover_front" => Some("Vorderdeckel"),
        "cover_back" => Some("Rückdeckel"),
        "title_page" => Some("Titelblatt"),
        "engraved_titlepage" => Some("Kupfertitel"),
        "preface" => Some("Vorwort"),
        "dedication" => Some("Widmung"),
        "chapter" => Some("Kapitel"),
        "section" => Some("Abschnitt"),
        "contents" => Some("Inhaltsverzeichnis"),
        "index" => Some("Register"),
        "imprint" => Some("Impressum"),
        "illustration" => Some("Illustration"),
        "map" => Some("Karte"),
        "table" => Some("Tabelle"),
        "additional" => Some("Beilage"),
        "volume" => Some("Band"),
        _ => None,
    }
}

/// Build the outline tree for a work.
///
/// `fallback_title` labels the root when the logical root container carries
/// neither label nor order label. With `render_leaves`, additional physical
/// targets of a division become plain page children.
pub fn build_structure_tree(
    store: &MetadataStore,
    fallback_title: &str,
    render_leaves: bool,
) -> Result<StructureNode> {
    let root_div = store
        .logical_root()
        .ok_or_else(|| Error::Structure("document has no logical structMap".to_string()))?;

    let mapper = Mapper {
        physical: physical_divs(store),
        links: structure_links(store),
        render_leaves,
    };

    let label = root_div
        .attr("LABEL")
        .or_else(|| root_div.attr("ORDERLABEL"))
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback_title.to_string());

    let mut root = StructureNode {
        label,
        page: 1,
        children: mapper.map_children(root_div)?,
    };
    prune_unresolved(&mut root);
    Ok(root)
}

/// Physical page divs by ID.
fn physical_divs(store: &MetadataStore) -> HashMap<String, XmlElement> {
    store
        .tree()
        .root
        .descendants()
        .into_iter()
        .find(|e| e.local_name() == "structMap" && e.attr("TYPE") == Some("PHYSICAL"))
        .map(|sm| {
            sm.descendants_named("div")
                .into_iter()
                .filter_map(|d| d.attr("ID").map(|id| (id.to_string(), d.clone())))
                .collect()
        })
        .unwrap_or_default()
}

/// All (from, to) pairs of the structLink section, in document order.
fn structure_links(store: &MetadataStore) -> Vec<(String, String)> {
    store
        .tree()
        .root
        .descendants()
        .into_iter()
        .filter(|e| e.local_name() == "smLink")
        .filter_map(|link| {
            Some((link.attr("from")?.to_string(), link.attr("to")?.to_string()))
        })
        .collect()
}

struct Mapper {
    physical: HashMap<String, XmlElement>,
    links: Vec<(String, String)>,
    render_leaves: bool,
}

impl Mapper {
    fn map_children(&self, div: &XmlElement) -> Result<Vec<StructureNode>> {
        let mut children = Vec::new();
        for child in div.child_elements() {
            if child.local_name() != "div" {
                continue;
            }
            let Some(logical_type) = child.attr("TYPE").filter(|t| !t.is_empty()) else {
                continue;
            };
            if let Some(node) = self.map_div(child, logical_type)? {
                children.push(node);
            }
        }
        Ok(children)
    }

    fn map_div(&self, div: &XmlElement, logical_type: &str) -> Result<Option<StructureNode>> {
        let label = div
            .attr("LABEL")
            .or_else(|| div.attr("ORDERLABEL"))
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .or_else(|| localize_type(logical_type).map(|s| s.to_string()));
        // No label, no mapped type: the division cannot appear in an outline.
        let Some(label) = label else {
            return Ok(None);
        };

        let page = match div.attr("ID") {
            Some(id) => self.resolve_page(id)?,
            None => UNRESOLVED,
        };

        let mut children = self.map_children(div)?;
        if self.render_leaves && !TOP_LEVEL_TYPES.contains(&logical_type) {
            if let Some(id) = div.attr("ID") {
                children.extend(self.page_leaves(id)?);
            }
        }

        Ok(Some(StructureNode {
            label,
            page,
            children,
        }))
    }

    /// First structLink target of a logical division, as a page number.
    fn resolve_page(&self, log_id: &str) -> Result<i32> {
        let Some((_, target)) = self.links.iter().find(|(from, _)| from == log_id) else {
            return Ok(UNRESOLVED);
        };
        self.page_of_target(target)
    }

    fn page_of_target(&self, target: &str) -> Result<i32> {
        if target == "physroot" {
            return Ok(1);
        }
        let div = self.physical.get(target).ok_or_else(|| {
            Error::Structure(format!("structLink target {} has no physical div", target))
        })?;
        div.attr("ORDER")
            .and_then(|o| o.parse::<i32>().ok())
            .ok_or_else(|| {
                Error::Structure(format!("physical div {} lacks a numeric ORDER", target))
            })
    }

    /// Plain page children from the additional physical targets of a
    /// division, ordered by page number.
    fn page_leaves(&self, log_id: &str) -> Result<Vec<StructureNode>> {
        let mut leaves = Vec::new();
        for (_, target) in self
            .links
            .iter()
            .filter(|(from, _)| from == log_id)
            .skip(1)
        {
            let page = self.page_of_target(target)?;
            let label = self
                .physical
                .get(target)
                .and_then(|d| d.attr("LABEL").or_else(|| d.attr("ORDERLABEL")))
                .map(|s| s.to_string())
                .unwrap_or_else(|| page.to_string());
            leaves.push(StructureNode {
                label,
                page,
                children: Vec::new(),
            });
        }
        leaves.sort_by_key(|l| l.page);
        Ok(leaves)
    }
}

/// Drop every subtree whose page stayed unresolved.
fn prune_unresolved(node: &mut StructureNode) {
    node.children.retain(|c| c.page != UNRESOLVED);
    for child in &mut node.children {
        prune_unresolved(child);
    }
}
