//! Boundary points, ranges and selections over the arena.
//!
//! These mirror the native Range/Selection semantics: a boundary point inside
//! a text node carries a char offset, one inside an element carries a child
//! index.

use std::cmp::Ordering;

use super::{Document, NodeId, char_slice};

/// A boundary point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub node: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }

    /// The point just before `node` in its parent.
    pub fn before(doc: &Document, node: NodeId) -> Option<Self> {
        Some(Self::new(doc.parent(node)?, doc.index_in_parent(node)?))
    }

    /// The point just after `node` in its parent.
    pub fn after(doc: &Document, node: NodeId) -> Option<Self> {
        Some(Self::new(doc.parent(node)?, doc.index_in_parent(node)? + 1))
    }
}

/// Compare two boundary points in document order.
pub fn compare_positions(doc: &Document, a: Position, b: Position) -> Ordering {
    if a.node == b.node {
        return a.offset.cmp(&b.offset);
    }
    if doc.contains(a.node, b.node) {
        // `b` lives under the child of `a.node` at `child_idx`.
        let child_idx = child_index_towards(doc, a.node, b.node);
        return if child_idx < a.offset {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if doc.contains(b.node, a.node) {
        return compare_positions(doc, b, a).reverse();
    }
    doc.cmp_tree_order(a.node, b.node)
}

/// Index of the child of `ancestor` that contains `node`.
fn child_index_towards(doc: &Document, ancestor: NodeId, node: NodeId) -> usize {
    let mut current = node;
    while let Some(parent) = doc.parent(current) {
        if parent == ancestor {
            return doc.index_in_parent(current).unwrap_or(0);
        }
        current = parent;
    }
    0
}

/// An ordered pair of boundary points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomRange {
    pub start: Position,
    pub end: Position,
}

impl DomRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn collapsed(at: Position) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// The text covered by the range, as a native range would stringify it.
    pub fn to_string(&self, doc: &Document) -> String {
        let mut out = String::new();
        if self.is_collapsed() {
            return out;
        }
        if self.start.node == self.end.node {
            if let Some(text) = doc.text(self.start.node) {
                return char_slice(text, self.start.offset, self.end.offset).to_string();
            }
        }
        let top = doc.tree_root(self.start.node);
        for node in std::iter::once(top).chain(doc.descendants(top)) {
            let Some(text) = doc.text(node) else {
                continue;
            };
            let len = text.chars().count();
            let from = if node == self.start.node {
                self.start.offset
            } else if compare_positions(doc, Position::new(node, 0), self.start) == Ordering::Less {
                continue;
            } else {
                0
            };
            let to = if node == self.end.node {
                self.end.offset
            } else if compare_positions(doc, Position::new(node, 0), self.end) != Ordering::Less {
                continue;
            } else {
                len
            };
            if from < to {
                out.push_str(char_slice(text, from, to));
            }
        }
        out
    }

    /// Whether `node` is entirely inside the range.
    pub fn contains_node(&self, doc: &Document, node: NodeId) -> bool {
        let (Some(before), Some(after)) = (Position::before(doc, node), Position::after(doc, node))
        else {
            return false;
        };
        compare_positions(doc, before, self.start) != Ordering::Less
            && compare_positions(doc, after, self.end) != Ordering::Greater
    }

    /// Whether any part of `node` overlaps the range.
    pub fn intersects_node(&self, doc: &Document, node: NodeId) -> bool {
        let (Some(before), Some(after)) = (Position::before(doc, node), Position::after(doc, node))
        else {
            return doc.contains(node, self.start.node);
        };
        (compare_positions(doc, before, self.end) == Ordering::Less
            && compare_positions(doc, after, self.start) == Ordering::Greater)
            || doc.contains(node, self.start.node)
    }
}

/// The editor's view of the user selection: anchor (where it started) and
/// focus (where it is now), in any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomSelection {
    pub anchor: Position,
    pub focus: Position,
}

impl DomSelection {
    pub fn new(anchor: Position, focus: Position) -> Self {
        Self { anchor, focus }
    }

    /// A caret.
    pub fn collapsed(at: Position) -> Self {
        Self {
            anchor: at,
            focus: at,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Whether the focus precedes the anchor.
    pub fn is_backwards(&self, doc: &Document) -> bool {
        compare_positions(doc, self.focus, self.anchor) == Ordering::Less
    }

    /// Order-corrected range.
    pub fn to_range(&self, doc: &Document) -> DomRange {
        if self.is_backwards(doc) {
            DomRange::new(self.focus, self.anchor)
        } else {
            DomRange::new(self.anchor, self.focus)
        }
    }
}

impl From<DomRange> for DomSelection {
    fn from(range: DomRange) -> Self {
        Self::new(range.start, range.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_paragraphs() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        let p1 = doc.create_element("p");
        let p2 = doc.create_element("p");
        let a = doc.create_text("first");
        let b = doc.create_text("second");
        doc.append_child(root, p1);
        doc.append_child(root, p2);
        doc.append_child(p1, a);
        doc.append_child(p2, b);
        (doc, root, a, b)
    }

    #[test]
    fn test_range_to_string_across_blocks() {
        let (doc, _, a, b) = two_paragraphs();
        let range = DomRange::new(Position::new(a, 2), Position::new(b, 3));
        assert_eq!(range.to_string(&doc), "rstsec");
    }

    #[test]
    fn test_range_to_string_element_points() {
        let (doc, root, _, _) = two_paragraphs();
        let range = DomRange::new(Position::new(root, 1), Position::new(root, 2));
        assert_eq!(range.to_string(&doc), "second");
    }

    #[test]
    fn test_compare_positions_ancestor() {
        let (doc, root, a, b) = two_paragraphs();
        assert_eq!(
            compare_positions(&doc, Position::new(root, 1), Position::new(a, 3)),
            Ordering::Greater
        );
        assert_eq!(
            compare_positions(&doc, Position::new(root, 1), Position::new(b, 0)),
            Ordering::Less
        );
    }

    #[test]
    fn test_backwards_selection_is_order_corrected() {
        let (doc, _, a, b) = two_paragraphs();
        let sel = DomSelection::new(Position::new(b, 1), Position::new(a, 1));
        assert!(sel.is_backwards(&doc));
        let range = sel.to_range(&doc);
        assert_eq!(range.start, Position::new(a, 1));
    }

    #[test]
    fn test_contains_node() {
        let (doc, root, a, b) = two_paragraphs();
        let p2 = doc.parent(b).unwrap();
        let range = DomRange::new(Position::new(a, 0), Position::new(root, 2));
        assert!(range.contains_node(&doc, p2));
        assert!(!range.contains_node(&doc, doc.parent(a).unwrap()));
        assert!(range.intersects_node(&doc, doc.parent(a).unwrap()));
    }
}
