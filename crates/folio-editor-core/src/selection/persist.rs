//! Offset-based selection snapshots that survive DOM rewrites.
//!
//! A snapshot records where the selection starts and ends as running
//! character offsets over the container's editable text. Any rewrite that
//! keeps the text but changes the element structure (rewrapping, unwrapping,
//! block conversion) can be restored exactly.

use std::cmp::Ordering;

use super::editable_text_nodes;
use crate::dom::{Document, DomSelection, NodeId, Position, compare_positions};

/// Durable form of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedSelection {
    pub container: NodeId,
    pub start: usize,
    pub end: usize,
    /// End node at capture time, used when the offsets no longer fit.
    pub end_container: Option<NodeId>,
}

impl SavedSelection {
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Snapshot `selection` relative to `container`.
///
/// Returns `None` when there is no selection.
pub fn save(
    doc: &Document,
    container: NodeId,
    selection: Option<&DomSelection>,
) -> Option<SavedSelection> {
    let selection = selection?;
    let range = selection.to_range(doc);
    let start = text_offset_of(doc, container, range.start);
    let end = start + range.to_string(doc).chars().count();
    tracing::trace!(target: "folio::selection", start, end, "saved selection");
    Some(SavedSelection {
        container,
        start,
        end,
        end_container: Some(range.end.node),
    })
}

/// Running editable-text offset of `pos` inside `container`.
fn text_offset_of(doc: &Document, container: NodeId, pos: Position) -> usize {
    let mut offset = 0;
    for text in editable_text_nodes(doc, container) {
        if text == pos.node {
            return offset + pos.offset.min(doc.node_len(text));
        }
        if compare_positions(doc, Position::new(text, 0), pos) != Ordering::Less {
            break;
        }
        offset += doc.node_len(text);
    }
    offset
}

/// Rebuild a selection from a snapshot.
///
/// When the document shrank and the end offset no longer matches, the end
/// falls back to the end of the stored end container (if it still lives
/// under the container), and otherwise collapses onto the start.
pub fn restore(doc: &Document, saved: Option<&SavedSelection>) -> Option<DomSelection> {
    let saved = saved?;
    if !doc.is_live(saved.container) {
        tracing::warn!(target: "folio::selection", "selection container is gone");
        return None;
    }

    let mut start = None;
    let mut end = None;
    let mut char_index = 0;
    for text in editable_text_nodes(doc, saved.container) {
        let next = char_index + doc.node_len(text);
        if start.is_none() && saved.start >= char_index && saved.start <= next {
            start = Some(Position::new(text, saved.start - char_index));
        }
        if start.is_some() && saved.end >= char_index && saved.end <= next {
            end = Some(Position::new(text, saved.end - char_index));
            break;
        }
        char_index = next;
    }

    let start = start.unwrap_or_else(|| {
        tracing::trace!(target: "folio::selection", "start offset out of range");
        Position::new(saved.container, 0)
    });
    let end = end.unwrap_or_else(|| {
        match saved.end_container {
            Some(node) if doc.is_live(node) && doc.contains(saved.container, node) => {
                tracing::trace!(target: "folio::selection", %node, "restoring end against end container");
                Position::new(node, doc.node_len(node))
            }
            _ => start,
        }
    });

    if compare_positions(doc, start, end) == Ordering::Greater {
        return Some(DomSelection::collapsed(start));
    }
    Some(DomSelection::new(start, end))
}

/// Caret at the first addressable text position inside `el`.
pub fn set_to_start(doc: &Document, el: NodeId) -> DomSelection {
    let at = match editable_text_nodes(doc, el).first() {
        Some(&text) => Position::new(text, 0),
        None => Position::new(el, 0),
    };
    DomSelection::collapsed(at)
}

/// Caret after the deepest last text node inside `el`.
pub fn set_to_end(doc: &Document, el: NodeId) -> DomSelection {
    let at = match editable_text_nodes(doc, el).last() {
        Some(&text) => Position::new(text, doc.node_len(text)),
        None => Position::new(el, doc.children(el).len()),
    };
    DomSelection::collapsed(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DomRange, parse_fragment};

    fn select_text(doc: &Document, root: NodeId, start: usize, end: usize) -> DomSelection {
        let saved = SavedSelection {
            container: root,
            start,
            end,
            end_container: None,
        };
        restore(doc, Some(&saved)).unwrap()
    }

    #[test]
    fn test_save_restore_roundtrip() {
        let mut doc = Document::new();
        let root = parse_fragment(&mut doc, "<p>Hello <b>bold</b></p><p>world</p>");
        let sel = select_text(&doc, root, 3, 12);
        let range = sel.to_range(&doc);
        assert_eq!(range.to_string(&doc), "lo boldwo");

        let saved = save(&doc, root, Some(&sel)).unwrap();
        assert_eq!((saved.start, saved.end), (3, 12));
    }

    #[test]
    fn test_restore_survives_rewrap() {
        let mut doc = Document::new();
        let root = parse_fragment(&mut doc, "<p>abc<i>def</i>ghi</p>");
        let sel = select_text(&doc, root, 2, 7);
        let saved = save(&doc, root, Some(&sel)).unwrap();

        // Unwrap the italic and rewrap the paragraph as a heading.
        let p = doc.first_child(root).unwrap();
        let i = doc.children(p)[1];
        doc.unwrap(i);
        doc.rename(p, "h2");
        let extra = doc.wrap(p, "blockquote");
        assert_eq!(doc.tag(extra), Some("blockquote"));

        let restored = restore(&doc, Some(&saved)).unwrap();
        assert_eq!(restored.to_range(&doc).to_string(&doc), "cdefg");
    }

    #[test]
    fn test_save_from_element_points() {
        let mut doc = Document::new();
        let root = parse_fragment(&mut doc, "<p>one</p><p>two</p>");
        let sel = DomSelection::new(Position::new(root, 1), Position::new(root, 2));
        let saved = save(&doc, root, Some(&sel)).unwrap();
        assert_eq!((saved.start, saved.end), (3, 6));
    }

    #[test]
    fn test_restore_falls_back_to_end_container() {
        let mut doc = Document::new();
        let root = parse_fragment(&mut doc, "<p>short</p>");
        let text = doc.text_nodes(root)[0];
        let saved = SavedSelection {
            container: root,
            start: 1,
            end: 40,
            end_container: Some(text),
        };
        let sel = restore(&doc, Some(&saved)).unwrap();
        assert_eq!(sel.focus, Position::new(text, 5));
    }

    #[test]
    fn test_restore_collapses_when_end_container_removed() {
        let mut doc = Document::new();
        let root = parse_fragment(&mut doc, "<p>short</p><p>gone</p>");
        let gone = doc.text_nodes(root)[1];
        let saved = SavedSelection {
            container: root,
            start: 2,
            end: 9,
            end_container: Some(gone),
        };
        let p2 = doc.children(root)[1];
        doc.remove(p2);
        let sel = restore(&doc, Some(&saved)).unwrap();
        assert!(sel.is_collapsed());
    }

    #[test]
    fn test_restore_none_is_noop() {
        let mut doc = Document::new();
        let root = doc.create_fragment();
        assert_eq!(restore(&doc, None), None);
        assert_eq!(save(&doc, root, None), None);
    }

    #[test]
    fn test_opaque_only_container_yields_zero() {
        let mut doc = Document::new();
        let root = parse_fragment(
            &mut doc,
            r#"<div contenteditable="false"><img src="a.png"></div>"#,
        );
        let sel = DomSelection::collapsed(Position::new(root, 1));
        let saved = save(&doc, root, Some(&sel)).unwrap();
        assert_eq!(saved.start, 0);
        let restored = restore(&doc, Some(&saved)).unwrap();
        assert_eq!(restored.anchor, Position::new(root, 0));
    }

    #[test]
    fn test_set_to_end_descends_to_last_text() {
        let mut doc = Document::new();
        let root = parse_fragment(&mut doc, "<p>ab<b>cd</b><i></i></p>");
        let p = doc.first_child(root).unwrap();
        let sel = set_to_end(&doc, p);
        let cd = doc.text_nodes(root)[1];
        assert_eq!(sel.anchor, Position::new(cd, 2));

        let empty = doc.children(p)[2];
        assert_eq!(set_to_end(&doc, empty).anchor, Position::new(empty, 0));
        assert_eq!(
            set_to_start(&doc, p).anchor,
            Position::new(doc.text_nodes(root)[0], 0)
        );
    }

    #[test]
    fn test_backwards_selection_saves_ordered_offsets() {
        let mut doc = Document::new();
        let root = parse_fragment(&mut doc, "<p>abcdef</p>");
        let t = doc.text_nodes(root)[0];
        let sel = DomSelection::new(Position::new(t, 5), Position::new(t, 1));
        let saved = save(&doc, root, Some(&sel)).unwrap();
        assert_eq!((saved.start, saved.end), (1, 5));
        let restored = restore(&doc, Some(&saved)).unwrap();
        assert_eq!(
            DomRange::new(restored.anchor, restored.focus).to_string(&doc),
            "bcde"
        );
    }
}
