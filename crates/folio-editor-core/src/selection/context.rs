//! Read-only queries about where the selection sits in the block model.
//!
//! Everything here is scoped to an editable root: selections whose anchor
//! lies elsewhere are treated as absent.

use crate::dom::{Document, DomRange, DomSelection, NodeId, Position};
use crate::platform::{Rect, SelectionGeometry};

/// The selection, if its anchor lies within `root`.
pub fn get_selection(
    doc: &Document,
    root: NodeId,
    selection: Option<&DomSelection>,
) -> Option<DomSelection> {
    let selection = selection?;
    if doc.is_live(selection.anchor.node) && doc.contains(root, selection.anchor.node) {
        Some(*selection)
    } else {
        None
    }
}

/// `node` and its ancestors, nearest first, stopping before `root`.
///
/// Empty when `node` is not under `root`.
pub fn get_parent_nodes(doc: &Document, root: NodeId, node: NodeId) -> Vec<NodeId> {
    if node == root || !doc.contains(root, node) {
        return Vec::new();
    }
    std::iter::once(node)
        .chain(doc.ancestors(node))
        .take_while(|&n| n != root)
        .collect()
}

/// Anchor and focus chains, nearest to farthest, deduplicated.
///
/// With `start_only`, only the anchor side is considered.
pub fn get_node_list(
    doc: &Document,
    root: NodeId,
    selection: Option<&DomSelection>,
    start_only: bool,
) -> Vec<NodeId> {
    let Some(selection) = get_selection(doc, root, selection) else {
        return Vec::new();
    };
    let mut nodes = get_parent_nodes(doc, root, selection.anchor.node);
    if !start_only {
        for node in get_parent_nodes(doc, root, selection.focus.node) {
            if !nodes.contains(&node) {
                nodes.push(node);
            }
        }
    }
    nodes
}

/// First node in the selection's node list whose tag is one of `names`.
pub fn get_node_by_names(
    doc: &Document,
    root: NodeId,
    names: &[&str],
    farthest_first: bool,
    selection: Option<&DomSelection>,
) -> Option<NodeId> {
    let mut nodes = get_node_list(doc, root, selection, false);
    if farthest_first {
        nodes.reverse();
    }
    nodes.into_iter().find(|&n| doc.has_tag(n, names))
}

/// Direct child of `root` holding `pos`.
fn root_child_at(doc: &Document, root: NodeId, pos: Position) -> Option<NodeId> {
    if pos.node == root {
        let children = doc.children(root);
        return children
            .get(pos.offset)
            .or_else(|| children.last())
            .copied();
    }
    get_parent_nodes(doc, root, pos.node).last().copied()
}

/// The root block holding `node`.
pub fn root_block_of(doc: &Document, root: NodeId, node: NodeId) -> Option<NodeId> {
    get_parent_nodes(doc, root, node).last().copied()
}

/// The contiguous run of root children from the block holding the
/// selection start to the block holding its end.
pub fn get_root_elements(
    doc: &Document,
    root: NodeId,
    selection: Option<&DomSelection>,
) -> Vec<NodeId> {
    let Some(selection) = get_selection(doc, root, selection) else {
        return Vec::new();
    };
    let range = selection.to_range(doc);
    let (Some(first), Some(last)) = (
        root_child_at(doc, root, range.start),
        root_child_at(doc, root, range.end),
    ) else {
        return Vec::new();
    };
    let (Some(from), Some(to)) = (doc.index_in_parent(first), doc.index_in_parent(last)) else {
        return Vec::new();
    };
    let (from, to) = if from <= to { (from, to) } else { (to, from) };
    doc.children(root)[from..=to].to_vec()
}

/// Whether a non-collapsed selection exists within `el`.
pub fn has_selection(doc: &Document, el: NodeId, selection: Option<&DomSelection>) -> bool {
    get_selection(doc, el, selection).is_some_and(|s| !s.is_collapsed())
}

/// Whether the selection start is at the beginning of `el`'s text.
pub fn is_cursor_at_start(
    doc: &Document,
    el: NodeId,
    selection: Option<&DomSelection>,
    trim: bool,
) -> bool {
    let Some(selection) = get_selection(doc, el, selection) else {
        return false;
    };
    let cursor = selection.to_range(doc).start;
    let before = DomRange::new(Position::new(el, 0), cursor).to_string(doc);
    if trim {
        before.trim().is_empty()
    } else {
        before.is_empty()
    }
}

/// Whether the selection end is at the end of `el`'s text.
pub fn is_cursor_at_end(
    doc: &Document,
    el: NodeId,
    selection: Option<&DomSelection>,
    trim: bool,
) -> bool {
    let Some(selection) = get_selection(doc, el, selection) else {
        return false;
    };
    let cursor = selection.to_range(doc).end;
    let before = DomRange::new(Position::new(el, 0), cursor).to_string(doc);
    let full = doc.text_content(el);
    if trim {
        before.trim_end().chars().count() >= full.trim_end().chars().count()
    } else {
        before.chars().count() == full.chars().count()
    }
}

/// Screen rectangle of the selection, when the platform can provide one.
pub fn get_context_coordinates(
    geometry: &dyn SelectionGeometry,
    selection: Option<&DomSelection>,
) -> Option<Rect> {
    selection?;
    geometry.selection_rect().filter(|r| !r.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_fragment;
    use crate::platform::NoGeometry;

    fn doc_with(html: &str) -> (Document, NodeId) {
        let mut doc = Document::new();
        let root = parse_fragment(&mut doc, html);
        (doc, root)
    }

    #[test]
    fn test_selection_outside_root_is_ignored() {
        let (mut doc, root) = doc_with("<p>inside</p>");
        let outside = doc.create_text("elsewhere");
        let sel = DomSelection::collapsed(Position::new(outside, 1));
        assert_eq!(get_selection(&doc, root, Some(&sel)), None);
        assert!(get_node_list(&doc, root, Some(&sel), false).is_empty());
    }

    #[test]
    fn test_node_list_and_lookup() {
        let (doc, root) = doc_with("<ul><li><b>one</b></li><li>two</li></ul>");
        let texts = doc.text_nodes(root);
        let sel = DomSelection::new(Position::new(texts[0], 1), Position::new(texts[1], 2));
        let nodes = get_node_list(&doc, root, Some(&sel), false);
        let tags: Vec<_> = nodes.iter().map(|&n| doc.tag(n).unwrap_or("#text")).collect();
        assert_eq!(tags, vec!["#text", "b", "li", "ul", "#text", "li"]);

        let li = get_node_by_names(&doc, root, &["li"], false, Some(&sel)).unwrap();
        assert_eq!(doc.text_content(li), "one");
        let caret = DomSelection::collapsed(Position::new(texts[0], 0));
        let ul = get_node_by_names(&doc, root, &["ul", "li"], true, Some(&caret)).unwrap();
        assert_eq!(doc.tag(ul), Some("ul"));
        assert!(get_node_by_names(&doc, root, &["i"], false, Some(&sel)).is_none());
    }

    #[test]
    fn test_root_elements_order_corrected() {
        let (doc, root) = doc_with("<p>a</p><p>b</p><p>c</p><p>d</p>");
        let texts = doc.text_nodes(root);
        let sel = DomSelection::new(Position::new(texts[2], 1), Position::new(texts[1], 0));
        let blocks = get_root_elements(&doc, root, Some(&sel));
        let text: Vec<_> = blocks.iter().map(|&b| doc.text_content(b)).collect();
        assert_eq!(text, vec!["b", "c"]);
    }

    #[test]
    fn test_cursor_at_boundaries() {
        let (doc, root) = doc_with("<p> abc </p>");
        let p = doc.first_child(root).unwrap();
        let t = doc.text_nodes(root)[0];
        let at = |offset| DomSelection::collapsed(Position::new(t, offset));

        assert!(is_cursor_at_start(&doc, p, Some(&at(0)), false));
        assert!(!is_cursor_at_start(&doc, p, Some(&at(1)), false));
        assert!(is_cursor_at_start(&doc, p, Some(&at(1)), true));
        assert!(is_cursor_at_end(&doc, p, Some(&at(5)), false));
        assert!(!is_cursor_at_end(&doc, p, Some(&at(4)), false));
        assert!(is_cursor_at_end(&doc, p, Some(&at(4)), true));
        assert!(!is_cursor_at_end(&doc, p, None, true));
    }

    #[test]
    fn test_has_selection() {
        let (doc, root) = doc_with("<p>abc</p>");
        let t = doc.text_nodes(root)[0];
        let caret = DomSelection::collapsed(Position::new(t, 1));
        let range = DomSelection::new(Position::new(t, 0), Position::new(t, 2));
        assert!(!has_selection(&doc, root, Some(&caret)));
        assert!(has_selection(&doc, root, Some(&range)));
    }

    #[test]
    fn test_coordinates_without_layout() {
        let (_doc, root) = doc_with("<p>abc</p>");
        let sel = DomSelection::collapsed(Position::new(root, 0));
        assert_eq!(get_context_coordinates(&NoGeometry, Some(&sel)), None);
    }
}
