//! Live DOM selection ↔ model selection.
//!
//! The live element and the model mirror each other node for node after a
//! render or an import, so a boundary point translates by its child-index
//! path. Text offsets differ in unit: the DOM counts UTF-16 code units, the
//! model counts chars.

use folio_editor_core::{Document, DomSelection, NodeId, PlatformError, Position};

use crate::dom_sync::{live_node_at, live_path, model_node_at, model_path};

/// Char offset of the UTF-16 offset `utf16` in `text`. Offsets inside a
/// surrogate pair round up to the following char.
pub fn utf16_to_char(text: &str, utf16: usize) -> usize {
    let mut units = 0;
    for (i, c) in text.chars().enumerate() {
        if units >= utf16 {
            return i;
        }
        units += c.len_utf16();
    }
    text.chars().count()
}

/// UTF-16 offset of the char offset `chars` in `text`.
pub fn char_to_utf16(text: &str, chars: usize) -> usize {
    text.chars().take(chars).map(char::len_utf16).sum()
}

/// Translate a live boundary point under `element` into a model position.
pub fn to_model_position(
    element: &web_sys::Element,
    doc: &Document,
    root: NodeId,
    node: &web_sys::Node,
    offset: u32,
) -> Option<Position> {
    let path = live_path(element, node)?;
    let target = model_node_at(doc, root, &path)?;
    let offset = match (node.node_type(), doc.text(target)) {
        (web_sys::Node::TEXT_NODE, Some(text)) => utf16_to_char(text, offset as usize),
        (web_sys::Node::TEXT_NODE, None) => return None,
        _ => (offset as usize).min(doc.children(target).len()),
    };
    Some(Position::new(target, offset))
}

/// Translate a model position into a live boundary point under `element`.
pub fn to_live_position(
    element: &web_sys::Element,
    doc: &Document,
    root: NodeId,
    at: Position,
) -> Option<(web_sys::Node, u32)> {
    let path = model_path(doc, root, at.node)?;
    let node = live_node_at(element, &path)?;
    let offset = match doc.text(at.node) {
        Some(text) => char_to_utf16(text, at.offset),
        None => at.offset,
    };
    Some((node, offset as u32))
}

/// The live selection as a model selection, when it lies inside `element`.
pub fn read_selection(
    element: &web_sys::Element,
    doc: &Document,
    root: NodeId,
) -> Option<DomSelection> {
    let window = web_sys::window()?;
    let selection = window.get_selection().ok()??;

    let anchor_node = selection.anchor_node()?;
    let focus_node = selection.focus_node()?;
    if !element.contains(Some(&anchor_node)) || !element.contains(Some(&focus_node)) {
        return None;
    }
    let anchor_offset = selection.anchor_offset();
    let focus_offset = selection.focus_offset();

    tracing::trace!(
        target: "folio::cursor",
        anchor_node_name = %anchor_node.node_name(),
        anchor_offset,
        focus_node_name = %focus_node.node_name(),
        focus_offset,
        "reading browser selection"
    );

    let anchor = to_model_position(element, doc, root, &anchor_node, anchor_offset)?;
    let focus = to_model_position(element, doc, root, &focus_node, focus_offset)?;
    Some(DomSelection::new(anchor, focus))
}

/// Put the live selection where the model selection is.
pub fn write_selection(
    element: &web_sys::Element,
    doc: &Document,
    root: NodeId,
    selection: &DomSelection,
) -> Result<(), PlatformError> {
    let (anchor_node, anchor_offset) = to_live_position(element, doc, root, selection.anchor)
        .ok_or("selection anchor has no live counterpart")?;
    let (focus_node, focus_offset) = to_live_position(element, doc, root, selection.focus)
        .ok_or("selection focus has no live counterpart")?;

    let window = web_sys::window().ok_or("no window")?;
    let live = window
        .get_selection()
        .map_err(|e| format!("get_selection failed: {:?}", e))?
        .ok_or("no selection object")?;

    tracing::trace!(
        target: "folio::cursor",
        anchor_offset,
        focus_offset,
        "restoring browser selection"
    );

    live.set_base_and_extent(&anchor_node, anchor_offset, &focus_node, focus_offset)
        .map_err(|e| format!("set_base_and_extent failed: {:?}", e))?;
    Ok(())
}
