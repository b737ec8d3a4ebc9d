//! Document outline (bookmarks) from the logical structure tree.
//!
//! The tree root becomes the single top-level outline entry; every node
//! gets a `FitB` destination on its 1-based page. All entries are open.

use std::collections::HashMap;

use crate::structure::StructureNode;

use super::object::{Object, ObjectRef};

/// Result of building the outline object graph.
pub struct OutlineBuildResult {
    /// Reference to the Outlines dictionary for the catalog
    pub root_ref: ObjectRef,
    /// All outline objects, id -> object
    pub objects: Vec<(u32, Object)>,
}

/// Build the outline objects for a structure tree.
///
/// `page_refs` maps 0-based page indexes to page objects; node pages outside
/// the document are clamped to the last page.
pub fn build_outline(
    tree: &StructureNode,
    page_refs: &[ObjectRef],
    alloc: &mut dyn FnMut() -> u32,
) -> Option<OutlineBuildResult> {
    if page_refs.is_empty() {
        return None;
    }

    let outlines_id = alloc();
    let mut objects: Vec<(u32, Object)> = Vec::new();
    let (item_id, descendants) =
        build_item(tree, outlines_id, page_refs, alloc, &mut objects);

    let mut outlines = HashMap::new();
    outlines.insert("Type".to_string(), Object::Name("Outlines".to_string()));
    outlines.insert("First".to_string(), Object::Reference(ObjectRef::new(item_id, 0)));
    outlines.insert("Last".to_string(), Object::Reference(ObjectRef::new(item_id, 0)));
    outlines.insert("Count".to_string(), Object::Integer(1 + descendants));
    objects.push((outlines_id, Object::Dictionary(outlines)));

    Some(OutlineBuildResult {
        root_ref: ObjectRef::new(outlines_id, 0),
        objects,
    })
}

/// Build one outline item and its children; returns its id and the number
/// of descendants below it.
fn build_item(
    node: &StructureNode,
    parent_id: u32,
    page_refs: &[ObjectRef],
    alloc: &mut dyn FnMut() -> u32,
    objects: &mut Vec<(u32, Object)>,
) -> (u32, i64) {
    let item_id = alloc();

    let mut child_ids: Vec<u32> = Vec::new();
    let mut descendants = 0i64;
    for child in &node.children {
        let (child_id, below) = build_item(child, item_id, page_refs, alloc, objects);
        child_ids.push(child_id);
        descendants += 1 + below;
    }

    // Wire sibling links between the direct children.
    for (i, &child_id) in child_ids.iter().enumerate() {
        let slot = objects
            .iter_mut()
            .find(|(id, _)| *id == child_id)
            .expect("child object just built");
        if let Object::Dictionary(dict) = &mut slot.1 {
            if i > 0 {
                dict.insert(
                    "Prev".to_string(),
                    Object::Reference(ObjectRef::new(child_ids[i - 1], 0)),
                );
            }
            if i + 1 < child_ids.len() {
                dict.insert(
                    "Next".to_string(),
                    Object::Reference(ObjectRef::new(child_ids[i + 1], 0)),
                );
            }
        }
    }

    let page_index = ((node.page.max(1) - 1) as usize).min(page_refs.len() - 1);
    let dest = Object::Array(vec![
        Object::Reference(page_refs[page_index]),
        Object::Name("FitB".to_string()),
    ]);

    let mut dict = HashMap::new();
    dict.insert(
        "Title".to_string(),
        Object::String(node.label.as_bytes().to_vec()),
    );
    dict.insert("Parent".to_string(), Object::Reference(ObjectRef::new(parent_id, 0)));
    dict.insert("Dest".to_string(), dest);
    if let (Some(&first), Some(&last)) = (child_ids.first(), child_ids.last()) {
        dict.insert("First".to_string(), Object::Reference(ObjectRef::new(first, 0)));
        dict.insert("Last".to_string(), Object::Reference(ObjectRef::new(last, 0)));
        dict.insert("Count".to_string(), Object::Integer(descendants));
    }

    objects.push((item_id, Object::Dictionary(dict)));
    (item_id, descendants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::syntax;

    fn rendered(obj: &Object) -> String {
        String::from_utf8_lossy(&syntax::render(obj)).into_owned()
    }

    fn tree() -> StructureNode {
        StructureNode {
            label: "Ode In Solemni Panegyri".to_string(),
            page: 1,
            children: vec![
                StructureNode {
                    label: "Titelblatt".to_string(),
                    page: 1,
                    children: Vec::new(),
                },
                StructureNode {
                    label: "[Ode]".to_string(),
                    page: 2,
                    children: Vec::new(),
                },
            ],
        }
    }

    fn alloc_from(start: u32) -> (impl FnMut() -> u32, std::rc::Rc<std::cell::Cell<u32>>) {
        let next = std::rc::Rc::new(std::cell::Cell::new(start));
        let n = next.clone();
        (
            move || {
                let id = n.get();
                n.set(id + 1);
                id
            },
            next,
        )
    }

    fn refs(n: usize) -> Vec<ObjectRef> {
        (0..n).map(|i| ObjectRef::new(100 + i as u32, 0)).collect()
    }

    #[test]
    fn test_outline_graph_counts() {
        let (mut alloc, _) = alloc_from(1);
        let result = build_outline(&tree(), &refs(4), &mut alloc).expect("outline built");
        // Outlines dict + root item + two children.
        assert_eq!(result.objects.len(), 4);

        let outlines = result
            .objects
            .iter()
            .find(|(id, _)| *id == result.root_ref.id)
            .unwrap();
        let out = rendered(&outlines.1);
        assert!(out.contains("/Type /Outlines"));
        assert!(out.contains("/Count 3"));
    }

    #[test]
    fn test_root_item_carries_label_and_children() {
        let (mut alloc, _) = alloc_from(1);
        let result = build_outline(&tree(), &refs(4), &mut alloc).expect("outline built");
        let entries: Vec<String> = result.objects.iter().map(|(_, o)| rendered(o)).collect();

        let root_item = entries
            .iter()
            .find(|r| r.contains("(Ode In Solemni Panegyri)"))
            .expect("root entry present");
        assert!(root_item.contains("/First"));
        assert!(root_item.contains("/Last"));
        assert!(root_item.contains("/Count 2"));

        assert!(entries.iter().any(|r| r.contains("(Titelblatt)")));
        assert!(entries.iter().any(|r| r.contains("([Ode])")));
    }

    #[test]
    fn test_destinations_are_fitb_on_page_objects() {
        let (mut alloc, _) = alloc_from(1);
        let result = build_outline(&tree(), &refs(2), &mut alloc).expect("outline built");
        let child = result
            .objects
            .iter()
            .map(|(_, o)| rendered(o))
            .find(|r| r.contains("([Ode])"))
            .unwrap();
        // Page 2 maps to the second page object.
        assert!(child.contains("[101 0 R /FitB]"));
    }

    #[test]
    fn test_sibling_links() {
        let (mut alloc, _) = alloc_from(1);
        let result = build_outline(&tree(), &refs(2), &mut alloc).expect("outline built");
        let first_child = result
            .objects
            .iter()
            .map(|(_, o)| rendered(o))
            .find(|r| r.contains("(Titelblatt)"))
            .unwrap();
        assert!(first_child.contains("/Next"));
        assert!(!first_child.contains("/Prev"));
    }

    #[test]
    fn test_no_outline_without_pages() {
        let (mut alloc, _) = alloc_from(1);
        assert!(build_outline(&tree(), &[], &mut alloc).is_none());
    }
}
