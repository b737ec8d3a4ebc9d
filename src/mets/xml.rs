//! A small owned XML tree for METS documents.
//!
//! quick-xml is stream-oriented; the METS projections and the enrichment
//! pass both need random access and in-place mutation, so the document is
//! materialised into this tree once and re-serialized after changes.
//! Element and attribute names keep their source prefixes; lookups match on
//! local names.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Error, Result};

/// A node in the tree: an element or a text run.
#[derive(Debug, Clone)]
pub enum XmlNode {
    /// Child element
    Element(XmlElement),
    /// Character data (unescaped)
    Text(String),
}

/// An XML element with its attributes and children, in document order.
#[derive(Debug, Clone, Default)]
pub struct XmlElement {
    /// Qualified name as it appears in the source (e.g. `mets:div`)
    pub name: String,
    /// Attributes in source order, qualified name -> unescaped value
    pub attributes: Vec<(String, String)>,
    /// Child nodes in document order
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder-style child element.
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// Builder-style text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    /// Name part after the namespace prefix.
    pub fn local_name(&self) -> &str {
        self.name.rsplit_once(':').map(|(_, l)| l).unwrap_or(&self.name)
    }

    /// Attribute value by local name.
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.rsplit_once(':').map(|(_, l)| l).unwrap_or(k) == local)
            .map(|(_, v)| v.as_str())
    }

    /// Set (or replace) an attribute by qualified name.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.attributes.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.attributes.push((key, value));
        }
    }

    /// Concatenated text content of this element and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out.trim().to_string()
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::Element(e) => e.collect_text(out),
            }
        }
    }

    /// Direct child elements.
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// First direct child with the given local name.
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.child_elements().find(|e| e.local_name() == local)
    }

    /// All descendant elements (pre-order, excluding self).
    pub fn descendants(&self) -> Vec<&XmlElement> {
        let mut out = Vec::new();
        self.collect_descendants(&mut out);
        out
    }

    fn collect_descendants<'a>(&'a self, out: &mut Vec<&'a XmlElement>) {
        for child in self.child_elements() {
            out.push(child);
            child.collect_descendants(out);
        }
    }

    /// First descendant with the given local name.
    pub fn descendant(&self, local: &str) -> Option<&XmlElement> {
        self.descendants().into_iter().find(|e| e.local_name() == local)
    }

    /// All descendants with the given local name.
    pub fn descendants_named(&self, local: &str) -> Vec<&XmlElement> {
        self.descendants()
            .into_iter()
            .filter(|e| e.local_name() == local)
            .collect()
    }

    /// Child-index path (pre-order) to the first descendant matching the
    /// predicate. The path indexes `children` at each level.
    pub fn find_path(&self, pred: &dyn Fn(&XmlElement) -> bool) -> Option<Vec<usize>> {
        for (idx, node) in self.children.iter().enumerate() {
            if let XmlNode::Element(e) = node {
                if pred(e) {
                    return Some(vec![idx]);
                }
                if let Some(mut sub) = e.find_path(pred) {
                    let mut path = vec![idx];
                    path.append(&mut sub);
                    return Some(path);
                }
            }
        }
        None
    }

    /// Mutable access to the element at a path produced by [`find_path`].
    ///
    /// [`find_path`]: XmlElement::find_path
    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut XmlElement> {
        let mut current = self;
        for &idx in path {
            current = match current.children.get_mut(idx)? {
                XmlNode::Element(e) => e,
                XmlNode::Text(_) => return None,
            };
        }
        Some(current)
    }

    /// Prefix of this element's qualified name, including the colon
    /// (`"mets:"`), or empty when unprefixed.
    pub fn prefix(&self) -> String {
        self.name
            .rsplit_once(':')
            .map(|(p, _)| format!("{}:", p))
            .unwrap_or_default()
    }
}

/// A parsed XML document: the declaration is regenerated on write.
#[derive(Debug, Clone)]
pub struct XmlTree {
    /// Document element
    pub root: XmlElement,
}

impl XmlTree {
    /// Parse a document from a string.
    pub fn parse(xml: &str, source: &str) -> Result<Self> {
        let parse_err = |reason: String| Error::Parse {
            source_file: source.to_string(),
            reason,
        };

        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf).map_err(|e| parse_err(e.to_string()))? {
                Event::Start(e) => {
                    stack.push(element_from_start(&e, source)?);
                }
                Event::Empty(e) => {
                    let element = element_from_start(&e, source)?;
                    attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| parse_err("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, element);
                }
                Event::Text(t) => {
                    let text = t
                        .unescape()
                        .map_err(|e| parse_err(e.to_string()))?
                        .into_owned();
                    if !text.trim().is_empty() {
                        if let Some(parent) = stack.last_mut() {
                            parent.children.push(XmlNode::Text(text));
                        }
                    }
                }
                Event::CData(t) => {
                    if let Some(parent) = stack.last_mut() {
                        parent
                            .children
                            .push(XmlNode::Text(String::from_utf8_lossy(&t).into_owned()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(parse_err("unexpected end of document".to_string()));
        }
        let root = root.ok_or_else(|| parse_err("document has no root element".to_string()))?;
        Ok(Self { root })
    }

    /// Serialize with an XML declaration and two-space indentation.
    pub fn to_string(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(io_to_mets_write)?;
        write_element(&mut writer, &self.root)?;
        let bytes = writer.into_inner();
        String::from_utf8(bytes).map_err(|e| Error::MetsWrite(e.to_string()))
    }
}

fn io_to_mets_write<E: std::fmt::Display>(e: E) -> Error {
    Error::MetsWrite(e.to_string())
}

fn attach(stack: &mut Vec<XmlElement>, root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn element_from_start(e: &BytesStart<'_>, source: &str) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut element = XmlElement::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::Parse {
            source_file: source.to_string(),
            reason: err.to_string(),
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| Error::Parse {
                source_file: source.to_string(),
                reason: err.to_string(),
            })?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start)).map_err(io_to_mets_write)?;
        return Ok(());
    }

    writer.write_event(Event::Start(start)).map_err(io_to_mets_write)?;
    for child in &element.children {
        match child {
            XmlNode::Element(e) => write_element(writer, e)?,
            XmlNode::Text(t) => writer
                .write_event(Event::Text(BytesText::new(t)))
                .map_err(io_to_mets_write)?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(io_to_mets_write)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mets:mets xmlns:mets="http://www.loc.gov/METS/" xmlns:xlink="http://www.w3.org/1999/xlink">
  <mets:fileSec>
    <mets:fileGrp USE="MAX">
      <mets:file ID="f1"><mets:FLocat xlink:href="737434.jpg"/></mets:file>
    </mets:fileGrp>
  </mets:fileSec>
  <mets:structMap TYPE="PHYSICAL">
    <mets:div TYPE="physSequence">
      <mets:div ORDER="1" TYPE="page" CONTENTIDS="urn:a &amp; b"/>
    </mets:div>
  </mets:structMap>
</mets:mets>"#;

    #[test]
    fn test_parse_names_and_prefixes() {
        let tree = XmlTree::parse(SAMPLE, "sample").expect("parses");
        assert_eq!(tree.root.name, "mets:mets");
        assert_eq!(tree.root.local_name(), "mets");
        assert_eq!(tree.root.prefix(), "mets:");
    }

    #[test]
    fn test_attr_matches_local_name() {
        let tree = XmlTree::parse(SAMPLE, "sample").expect("parses");
        let flocat = tree.root.descendant("FLocat").expect("FLocat present");
        assert_eq!(flocat.attr("href"), Some("737434.jpg"));
    }

    #[test]
    fn test_attribute_values_are_unescaped() {
        let tree = XmlTree::parse(SAMPLE, "sample").expect("parses");
        let page = tree
            .root
            .descendants_named("div")
            .into_iter()
            .find(|d| d.attr("TYPE") == Some("page"))
            .expect("page div");
        assert_eq!(page.attr("CONTENTIDS"), Some("urn:a & b"));
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let tree = XmlTree::parse(SAMPLE, "sample").expect("parses");
        let rendered = tree.to_string().expect("serializes");
        let again = XmlTree::parse(&rendered, "round-trip").expect("re-parses");
        assert_eq!(again.root.descendants().len(), tree.root.descendants().len());
        assert!(rendered.contains("urn:a &amp; b"));
        assert!(rendered.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    }

    #[test]
    fn test_find_path_and_mutate() {
        let mut tree = XmlTree::parse(SAMPLE, "sample").expect("parses");
        let path = tree
            .root
            .find_path(&|e| e.local_name() == "fileGrp")
            .expect("fileGrp path");
        let file_grp = tree.root.element_at_mut(&path).expect("navigates");
        file_grp.set_attr("USE", "DEFAULT");
        assert_eq!(
            tree.root.descendant("fileGrp").unwrap().attr("USE"),
            Some("DEFAULT")
        );
    }

    #[test]
    fn test_unbalanced_document_is_parse_error() {
        let err = XmlTree::parse("<a><b></a>", "broken").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_text_concatenation() {
        let tree =
            XmlTree::parse("<r><t>Hans  </t><t>von Brühl</t></r>", "t").expect("parses");
        assert_eq!(tree.root.text(), "Hans  von Brühl");
    }
}
