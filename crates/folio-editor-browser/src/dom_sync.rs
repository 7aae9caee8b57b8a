//! Live DOM ↔ model synchronization.
//!
//! The model is the source of truth. Native editing lands in the live
//! element first and is imported wholesale; anything the model changes is
//! rendered back through `innerHTML`. Both directions keep the two trees
//! structurally identical, which is what lets [`crate::cursor`] translate
//! boundary points by path.

use folio_editor_core::dom::parse_fragment;
use folio_editor_core::editor::PLACEHOLDER_ATTR;
use folio_editor_core::{Document, Editor, NodeId};

/// Child-index path from `element` down to `node`.
pub fn live_path(element: &web_sys::Element, node: &web_sys::Node) -> Option<Vec<u32>> {
    let root: &web_sys::Node = element;
    let mut path = Vec::new();
    let mut current = node.clone();
    while !current.is_same_node(Some(root)) {
        let parent = current.parent_node()?;
        path.push(live_index(&parent, &current)?);
        current = parent;
    }
    path.reverse();
    Some(path)
}

fn live_index(parent: &web_sys::Node, child: &web_sys::Node) -> Option<u32> {
    let children = parent.child_nodes();
    (0..children.length()).find(|&i| {
        children
            .item(i)
            .is_some_and(|c| c.is_same_node(Some(child)))
    })
}

/// The live node at `path` under `element`.
pub fn live_node_at(element: &web_sys::Element, path: &[u32]) -> Option<web_sys::Node> {
    let root: &web_sys::Node = element;
    path.iter()
        .try_fold(root.clone(), |node, &i| node.child_nodes().item(i))
}

/// Child-index path from `root` down to `node` in the model.
pub fn model_path(doc: &Document, root: NodeId, node: NodeId) -> Option<Vec<u32>> {
    let mut path = Vec::new();
    let mut current = node;
    while current != root {
        path.push(doc.index_in_parent(current)? as u32);
        current = doc.parent(current)?;
    }
    path.reverse();
    Some(path)
}

/// The model node at `path` under `root`.
pub fn model_node_at(doc: &Document, root: NodeId, path: &[u32]) -> Option<NodeId> {
    path.iter()
        .try_fold(root, |node, &i| doc.children(node).get(i as usize).copied())
}

/// Replace the model content with whatever the live element holds now.
///
/// No filtering and no notification: the caller reports the input so the
/// editor can normalize it on its own schedule.
pub fn import_live<E: Editor>(editor: &mut E, element: &web_sys::Element) {
    let html = element.inner_html();
    let state = editor.state_mut();
    let root = state.root();
    let doc = state.doc_mut();
    doc.remove_children(root);
    let fragment = parse_fragment(doc, &html);
    doc.move_children(fragment, root);
    doc.remove(fragment);

    tracing::trace!(target: "folio::dom_sync", len = html.len(), "imported live content");
}

/// Write the model content into the live element and mirror the
/// placeholder attribute onto it.
pub fn render<E: Editor>(editor: &E, element: &web_sys::Element) {
    let state = editor.state();
    element.set_inner_html(&editor.get_html());

    let result = match state.doc().attr(state.root(), PLACEHOLDER_ATTR) {
        Some(text) => element.set_attribute(PLACEHOLDER_ATTR, text),
        None => element.remove_attribute(PLACEHOLDER_ATTR),
    };
    if let Err(e) = result {
        tracing::warn!("placeholder attribute update failed: {:?}", e);
    }

    tracing::trace!(
        target: "folio::dom_sync",
        revision = state.revision(),
        "rendered model into live element"
    );
}
