//! Selection persistence and context queries.
//!
//! There is no global selection: callers pass the current
//! [`DomSelection`](crate::dom::DomSelection) in and get new ones back.

pub mod context;
pub mod persist;

pub use context::{
    get_context_coordinates, get_node_by_names, get_node_list, get_parent_nodes,
    get_root_elements, get_selection, has_selection, is_cursor_at_end, is_cursor_at_start,
    root_block_of,
};
pub use persist::{SavedSelection, restore, save, set_to_end, set_to_start};

use crate::dom::{Document, NodeId};

/// Text nodes under `container` in document order, skipping the contents of
/// any element marked non-editable.
pub fn editable_text_nodes(doc: &Document, container: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = doc.children(container).iter().rev().copied().collect();
    while let Some(node) = stack.pop() {
        if doc.is_text(node) {
            out.push(node);
        } else if !doc.is_non_editable(node) {
            stack.extend(doc.children(node).iter().rev().copied());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_fragment;

    #[test]
    fn test_editable_text_nodes_skip_opaque_subtrees() {
        let mut doc = Document::new();
        let root = parse_fragment(
            &mut doc,
            r#"<p>one</p><div contenteditable="false"><p>hidden</p></div><p>two</p>"#,
        );
        let texts: Vec<_> = editable_text_nodes(&doc, root)
            .into_iter()
            .filter_map(|t| doc.text(t))
            .collect();
        assert_eq!(texts, vec!["one", "two"]);
    }
}
