//! METS enrichment: registers the produced PDF inside the source document.
//!
//! Adds a SOFTWARE agent note to the header, a `fileGrp USE="DOWNLOAD"`
//! with the PDF file entry, and an `fptr` reference as the first child of
//! the logical container. Repeating the pass with the same identifier never
//! duplicates the file group or the pointer.

use chrono::Local;
use log::{debug, info};

use crate::error::Result;
use crate::mets::{MetadataStore, XmlElement, XmlNode};

/// Logical container types that receive the PDF pointer.
const CONTAINER_TYPES: [&str; 2] = ["monograph", "volume"];

/// Writes PDF references into METS documents.
#[derive(Debug, Clone)]
pub struct Enricher {
    /// Tool label recorded in the agent entry, e.g. `quire V0.1.0`
    agent_label: String,
    /// Stably sort container children so fptr elements precede divs
    reorder: bool,
}

impl Enricher {
    /// Create an enricher with the injected tool label.
    pub fn new(agent_label: impl Into<String>) -> Self {
        Self {
            agent_label: agent_label.into(),
            reorder: false,
        }
    }

    /// Request fptr-before-div ordering of the container children.
    pub fn with_reorder(mut self, reorder: bool) -> Self {
        self.reorder = reorder;
        self
    }

    /// Enrich the document for `identifier` and persist it.
    pub fn enrich(&self, store: &mut MetadataStore, identifier: &str) -> Result<()> {
        let prefix = store.tree().root.prefix();
        self.add_agent(store, identifier, &prefix);
        self.add_file_group(store, identifier, &prefix);
        self.add_logical_fptr(store, identifier, &prefix);
        store.save()?;
        info!("registered PDF_{} in {}", identifier, store.path().display());
        Ok(())
    }

    /// Append the SOFTWARE agent entry, creating `metsHdr` when absent.
    fn add_agent(&self, store: &mut MetadataStore, identifier: &str, prefix: &str) {
        let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();
        let agent = XmlElement::new(format!("{}agent", prefix))
            .with_attr("TYPE", "OTHER")
            .with_attr("ROLE", "OTHER")
            .with_attr("OTHERTYPE", "SOFTWARE")
            .with_child(
                XmlElement::new(format!("{}name", prefix)).with_text(self.agent_label.clone()),
            )
            .with_child(XmlElement::new(format!("{}note", prefix)).with_text(format!(
                "PDF FileGroup for {} created at {}",
                identifier, timestamp
            )));

        let root = &mut store.tree_mut().root;
        match root.find_path(&|e| e.local_name() == "metsHdr") {
            Some(path) => {
                let hdr = root.element_at_mut(&path).expect("path just resolved");
                hdr.children.push(XmlNode::Element(agent));
            }
            None => {
                let hdr = XmlElement::new(format!("{}metsHdr", prefix))
                    .with_attr("CREATEDATE", timestamp)
                    .with_child(agent);
                // The header must lead the document.
                root.children.insert(0, XmlNode::Element(hdr));
            }
        }
    }

    /// Insert the DOWNLOAD file group, or complete an existing one.
    fn add_file_group(&self, store: &mut MetadataStore, identifier: &str, prefix: &str) {
        let file_id = format!("PDF_{}", identifier);
        let root = &mut store.tree_mut().root;

        if let Some(path) =
            root.find_path(&|e| e.local_name() == "fileGrp" && e.attr("USE") == Some("DOWNLOAD"))
        {
            let group = root.element_at_mut(&path).expect("path just resolved");
            let already = group
                .descendants_named("file")
                .into_iter()
                .any(|f| f.attr("ID") == Some(file_id.as_str()));
            if !already {
                group
                    .children
                    .push(XmlNode::Element(pdf_file_entry(&file_id, identifier, prefix)));
            } else {
                debug!("fileGrp DOWNLOAD already lists {}", file_id);
            }
            return;
        }

        let group = XmlElement::new(format!("{}fileGrp", prefix))
            .with_attr("USE", "DOWNLOAD")
            .with_child(pdf_file_entry(&file_id, identifier, prefix));

        match root.find_path(&|e| e.local_name() == "fileSec") {
            Some(path) => {
                let file_sec = root.element_at_mut(&path).expect("path just resolved");
                file_sec.children.push(XmlNode::Element(group));
            }
            None => {
                let file_sec =
                    XmlElement::new(format!("{}fileSec", prefix)).with_child(group);
                // Keep document order plausible: file section before the
                // structural maps.
                let at = root
                    .children
                    .iter()
                    .position(|n| {
                        matches!(n, XmlNode::Element(e) if e.local_name() == "structMap")
                    })
                    .unwrap_or(root.children.len());
                root.children.insert(at, XmlNode::Element(file_sec));
            }
        }
    }

    /// Point the logical container at the PDF, first in its child list.
    fn add_logical_fptr(&self, store: &mut MetadataStore, identifier: &str, prefix: &str) {
        let file_id = format!("PDF_{}", identifier);
        let root = &mut store.tree_mut().root;

        let Some(path) = root.find_path(&|e| {
            e.local_name() == "div"
                && e.attr("TYPE").is_some_and(|t| CONTAINER_TYPES.contains(&t))
        }) else {
            debug!("no monograph/volume container; PDF fptr not linked");
            return;
        };
        let container = root.element_at_mut(&path).expect("path just resolved");

        let already = container.child_elements().any(|e| {
            e.local_name() == "fptr" && e.attr("FILEID") == Some(file_id.as_str())
        });
        if !already {
            let fptr = XmlElement::new(format!("{}fptr", prefix)).with_attr("FILEID", file_id);
            container.children.insert(0, XmlNode::Element(fptr));
        }

        if self.reorder {
            container.children.sort_by_key(|n| match n {
                XmlNode::Element(e) if e.local_name() == "fptr" => 0,
                _ => 1,
            });
        }
    }
}

fn pdf_file_entry(file_id: &str, identifier: &str, prefix: &str) -> XmlElement {
    XmlElement::new(format!("{}file", prefix))
        .with_attr("ID", file_id)
        .with_attr("MIMETYPE", "application/pdf")
        .with_child(
            XmlElement::new(format!("{}FLocat", prefix))
                .with_attr("LOCTYPE", "URL")
                .with_attr("xlink:href", format!("{}.pdf", identifier)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mets::XmlTree;
    use std::path::PathBuf;

    const SAMPLE: &str = r#"<mets:mets xmlns:mets="http://www.loc.gov/METS/" xmlns:xlink="http://www.w3.org/1999/xlink">
  <mets:fileSec>
    <mets:fileGrp USE="MAX">
      <mets:file ID="MAX_1"><mets:FLocat xlink:href="737434.jpg"/></mets:file>
    </mets:fileGrp>
  </mets:fileSec>
  <mets:structMap TYPE="LOGICAL">
    <mets:div ID="log737429" TYPE="monograph" LABEL="Ode">
      <mets:div ID="log2" TYPE="title_page"/>
    </mets:div>
  </mets:structMap>
</mets:mets>"#;

    fn store() -> MetadataStore {
        let tree = XmlTree::parse(SAMPLE, "test").expect("parses");
        MetadataStore::from_tree(tree, PathBuf::from("unused.xml"))
    }

    fn enrich_in_memory(store: &mut MetadataStore, reorder: bool) {
        // Exercise the mutations without touching the filesystem.
        let enricher = Enricher::new("quire V0.0.0").with_reorder(reorder);
        let prefix = store.tree().root.prefix();
        enricher.add_agent(store, "191092622", &prefix);
        enricher.add_file_group(store, "191092622", &prefix);
        enricher.add_logical_fptr(store, "191092622", &prefix);
    }

    #[test]
    fn test_agent_entry_created_with_header() {
        let mut s = store();
        enrich_in_memory(&mut s, false);
        let root = &s.tree().root;
        let hdr = root.child("metsHdr").expect("header created");
        let agent = hdr.child("agent").expect("agent present");
        assert_eq!(agent.attr("OTHERTYPE"), Some("SOFTWARE"));
        assert_eq!(agent.child("name").unwrap().text(), "quire V0.0.0");
        let note = agent.child("note").unwrap().text();
        assert!(note.starts_with("PDF FileGroup for 191092622 created at "));
        // Header leads the document.
        assert!(matches!(
            &root.children[0],
            XmlNode::Element(e) if e.local_name() == "metsHdr"
        ));
    }

    #[test]
    fn test_download_group_and_fptr_inserted() {
        let mut s = store();
        enrich_in_memory(&mut s, false);
        let root = &s.tree().root;

        let group = root
            .descendants()
            .into_iter()
            .find(|e| e.local_name() == "fileGrp" && e.attr("USE") == Some("DOWNLOAD"))
            .expect("DOWNLOAD group");
        let file = group.child("file").expect("file entry");
        assert_eq!(file.attr("ID"), Some("PDF_191092622"));
        assert_eq!(
            file.child("FLocat").unwrap().attr("href"),
            Some("191092622.pdf")
        );

        let container = root
            .descendants()
            .into_iter()
            .find(|e| e.attr("TYPE") == Some("monograph"))
            .expect("container");
        match &container.children[0] {
            XmlNode::Element(e) => {
                assert_eq!(e.local_name(), "fptr");
                assert_eq!(e.attr("FILEID"), Some("PDF_191092622"));
            }
            other => panic!("expected fptr first, got {:?}", other),
        }
    }

    #[test]
    fn test_repeat_enrichment_is_idempotent() {
        let mut s = store();
        enrich_in_memory(&mut s, false);
        enrich_in_memory(&mut s, false);
        let root = &s.tree().root;

        let downloads: Vec<_> = root
            .descendants()
            .into_iter()
            .filter(|e| e.local_name() == "fileGrp" && e.attr("USE") == Some("DOWNLOAD"))
            .collect();
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].descendants_named("file").len(), 1);

        let container = root
            .descendants()
            .into_iter()
            .find(|e| e.attr("TYPE") == Some("monograph"))
            .unwrap();
        let fptrs = container
            .child_elements()
            .filter(|e| e.local_name() == "fptr")
            .count();
        assert_eq!(fptrs, 1);
    }

    #[test]
    fn test_reorder_moves_fptrs_before_divs() {
        let mut s = store();
        enrich_in_memory(&mut s, true);
        let container = s
            .tree()
            .root
            .descendants()
            .into_iter()
            .find(|e| e.attr("TYPE") == Some("monograph"))
            .unwrap()
            .clone();
        let kinds: Vec<&str> = container.child_elements().map(|e| e.local_name()).collect();
        let first_div = kinds.iter().position(|k| *k == "div").unwrap();
        assert!(kinds[..first_div].iter().all(|k| *k == "fptr"));
    }

    #[test]
    fn test_enrich_persists_to_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("737429.xml");
        std::fs::write(&path, SAMPLE).expect("seed file");

        let mut s = MetadataStore::open(&path).expect("opens");
        Enricher::new("quire V0.0.0")
            .enrich(&mut s, "191092622")
            .expect("enrich succeeds");

        let written = std::fs::read_to_string(&path).expect("read back");
        assert!(written.contains("USE=\"DOWNLOAD\""));
        assert!(written.contains("PDF_191092622"));
        assert!(written.contains("metsHdr"));
    }
}
