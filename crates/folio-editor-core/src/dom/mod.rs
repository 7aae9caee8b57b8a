//! Arena-backed document model.
//!
//! The editor never talks to a live DOM directly. Every node lives in a
//! `Document` arena and is addressed by a copyable `NodeId`, which keeps
//! node references stable across the structural rewrites the filter and
//! command pipeline perform (renaming, unwrapping, re-parenting).
//!
//! Removed nodes are freed but their slots are never reused, so a stale
//! `NodeId` can be detected instead of silently pointing at a new node.

mod parse;
mod range;
mod serialize;

use std::cmp::Ordering;

use smol_str::SmolStr;

pub use parse::parse_fragment;
pub use range::{DomRange, DomSelection, Position, compare_positions};
pub use serialize::{escape_attr, escape_text, inner_html, outer_html};

/// Attribute marking a subtree as opaque to editing.
pub const CONTENTEDITABLE_ATTR: &str = "contenteditable";

/// Index of a node inside a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Raw arena index (useful for logging).
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Element tag and attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Lowercase tag name.
    pub tag: SmolStr,
    /// Attributes in source order. Names are lowercase.
    pub attrs: Vec<(SmolStr, String)>,
}

/// Payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element(ElementData),
    Text(String),
    Comment(String),
    /// Detached container with no markup of its own.
    Fragment,
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Node arena.
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<Option<Node>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    // === Creation ===

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node {
            data,
            parent: None,
            children: Vec::new(),
        }));
        id
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(ElementData {
            tag: SmolStr::new(tag.to_ascii_lowercase()),
            attrs: Vec::new(),
        }))
    }

    /// Create a detached element with attributes.
    pub fn create_element_with_attrs(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = self.create_element(tag);
        for (name, value) in attrs {
            self.set_attr(id, name, value);
        }
        id
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    /// Create a detached comment node.
    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Comment(text.into()))
    }

    /// Create an empty fragment.
    pub fn create_fragment(&mut self) -> NodeId {
        self.push(NodeData::Fragment)
    }

    // === Inspection ===

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Whether the id refers to a live (not removed) node.
    pub fn is_live(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.node(id).map(|n| &n.data)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.data(id), Some(NodeData::Element(_)))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.data(id), Some(NodeData::Text(_)))
    }

    /// Tag name for element nodes.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            Some(NodeData::Element(el)) => Some(el.tag.as_str()),
            _ => None,
        }
    }

    /// Whether the node is an element whose tag is one of `tags`.
    pub fn has_tag(&self, id: NodeId, tags: &[&str]) -> bool {
        self.tag(id).is_some_and(|t| tags.contains(&t))
    }

    /// Text of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            Some(NodeData::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Replace the contents of a text node.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let Some(Node {
            data: NodeData::Text(current),
            ..
        }) = self.node_mut(id)
        {
            *current = text.into();
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// Position of the node among its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        self.children(parent).get(idx + 1).copied()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        idx.checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    /// Ancestors from the parent upwards.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// Topmost ancestor (the node itself when detached).
    pub fn tree_root(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// Whether `node` is `ancestor` or one of its descendants.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// All descendants in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Descendant text nodes in document order.
    pub fn text_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.is_text(n))
            .collect()
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Length of a node for range purposes: chars for text, child count otherwise.
    pub fn node_len(&self, id: NodeId) -> usize {
        match self.data(id) {
            Some(NodeData::Text(text)) => text.chars().count(),
            Some(NodeData::Comment(_)) | None => 0,
            _ => self.children(id).len(),
        }
    }

    /// Child indices from the tree root down to `id`.
    fn path(&self, id: NodeId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(idx) = self.index_in_parent(current) {
            path.push(idx);
            current = match self.parent(current) {
                Some(p) => p,
                None => break,
            };
        }
        path.reverse();
        path
    }

    /// Compare two nodes in document (pre-)order.
    pub fn cmp_tree_order(&self, a: NodeId, b: NodeId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let (ra, rb) = (self.tree_root(a), self.tree_root(b));
        if ra != rb {
            return ra.cmp(&rb);
        }
        self.path(a).cmp(&self.path(b))
    }

    // === Attributes ===

    pub fn attrs(&self, id: NodeId) -> &[(SmolStr, String)] {
        match self.data(id) {
            Some(NodeData::Element(el)) => el.attrs.as_slice(),
            _ => &[],
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(Node {
            data: NodeData::Element(el),
            ..
        }) = self.node_mut(id)
        {
            let name = name.to_ascii_lowercase();
            match el.attrs.iter_mut().find(|(n, _)| n.as_str() == name) {
                Some((_, v)) => *v = value.to_string(),
                None => el.attrs.push((SmolStr::new(name), value.to_string())),
            }
        }
    }

    /// Remove an attribute. Returns whether it was present.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> bool {
        if let Some(Node {
            data: NodeData::Element(el),
            ..
        }) = self.node_mut(id)
        {
            let before = el.attrs.len();
            el.attrs.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
            return el.attrs.len() != before;
        }
        false
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|c| c.split_ascii_whitespace().any(|t| t == class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        let value = match self.attr(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attr(id, "class", &value);
    }

    /// Whether the element is explicitly marked `contenteditable="false"`.
    pub fn is_non_editable(&self, id: NodeId) -> bool {
        self.attr(id, CONTENTEDITABLE_ATTR)
            .is_some_and(|v| v.eq_ignore_ascii_case("false"))
    }

    // === Mutation ===

    /// Detach a node from its parent, keeping it alive.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|&c| c != id);
        }
        if let Some(n) = self.node_mut(id) {
            n.parent = None;
        }
    }

    /// Detach a node and free it together with its subtree.
    pub fn remove(&mut self, id: NodeId) {
        self.detach(id);
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            if let Some(freed) = self.nodes.get_mut(node.0).and_then(Option::take) {
                stack.extend(freed.children);
            }
        }
    }

    /// Remove (and free) every child of `id`.
    pub fn remove_children(&mut self, id: NodeId) {
        for child in self.children(id).to_vec() {
            self.remove(child);
        }
    }

    /// Insert `child` into `parent` at `index` (clamped), detaching it first.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if parent == child || self.contains(child, parent) {
            tracing::warn!(%parent, %child, "refusing to insert a node into its own subtree");
            return;
        }
        if !self.is_live(parent) || !self.is_live(child) {
            return;
        }
        self.detach(child);
        if let Some(p) = self.node_mut(parent) {
            let index = index.min(p.children.len());
            p.children.insert(index, child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_child(parent, usize::MAX, child);
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_child(parent, 0, child);
    }

    /// Insert `node` immediately before `reference`.
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) {
        if reference == node {
            return;
        }
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.detach(node);
        if let Some(idx) = self.index_in_parent(reference) {
            self.insert_child(parent, idx, node);
        }
    }

    /// Insert `node` immediately after `reference`.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) {
        if reference == node {
            return;
        }
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.detach(node);
        if let Some(idx) = self.index_in_parent(reference) {
            self.insert_child(parent, idx + 1, node);
        }
    }

    /// Move all children of `from` to the end of `to`.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        for child in self.children(from).to_vec() {
            self.append_child(to, child);
        }
    }

    /// Replace a node by its children, in place. The node itself is freed.
    pub fn unwrap(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        let Some(mut idx) = self.index_in_parent(id) else {
            return;
        };
        for child in self.children(id).to_vec() {
            self.insert_child(parent, idx, child);
            idx += 1;
        }
        self.remove(id);
    }

    /// Put `new` where `old` is. `old` stays alive but detached.
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) {
        if old == new {
            return;
        }
        self.insert_before(old, new);
        self.detach(old);
    }

    /// Change an element's tag, keeping attributes and children.
    pub fn rename(&mut self, id: NodeId, tag: &str) {
        if let Some(Node {
            data: NodeData::Element(el),
            ..
        }) = self.node_mut(id)
        {
            el.tag = SmolStr::new(tag.to_ascii_lowercase());
        }
    }

    /// Wrap a node in a new element, returning the wrapper.
    pub fn wrap(&mut self, id: NodeId, tag: &str) -> NodeId {
        let wrapper = self.create_element(tag);
        self.insert_before(id, wrapper);
        self.append_child(wrapper, id);
        wrapper
    }

    /// Merge adjacent text nodes and drop empty ones throughout the subtree.
    pub fn normalize(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        let mut previous_text: Option<NodeId> = None;
        for child in children {
            match self.data(child) {
                Some(NodeData::Text(text)) => {
                    if text.is_empty() {
                        self.remove(child);
                        continue;
                    }
                    match previous_text {
                        Some(prev) => {
                            let merged = format!(
                                "{}{}",
                                self.text(prev).unwrap_or_default(),
                                self.text(child).unwrap_or_default()
                            );
                            self.set_text(prev, merged);
                            self.remove(child);
                        }
                        None => previous_text = Some(child),
                    }
                }
                _ => {
                    previous_text = None;
                    self.normalize(child);
                }
            }
        }
    }

    /// Copy a subtree, returning the detached copy.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let Some(data) = self.data(id).cloned() else {
            return self.create_fragment();
        };
        let copy = self.push(data);
        for child in self.children(id).to_vec() {
            let child_copy = self.deep_clone(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Copy a node without its children.
    pub fn shallow_clone(&mut self, id: NodeId) -> NodeId {
        let data = self.data(id).cloned().unwrap_or(NodeData::Fragment);
        self.push(data)
    }

    /// Copy a subtree from another document into this one.
    pub fn import(&mut self, other: &Document, id: NodeId) -> NodeId {
        let data = other.data(id).cloned().unwrap_or(NodeData::Fragment);
        let copy = self.push(data);
        for &child in other.children(id) {
            let child_copy = self.import(other, child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Split a text node at a char offset. Returns the new right-hand node,
    /// or `None` when the offset is at either edge.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Option<NodeId> {
        let text = self.text(id)?;
        let len = text.chars().count();
        if offset == 0 || offset >= len {
            return None;
        }
        let byte = char_to_byte(text, offset);
        let (left, right) = (text[..byte].to_string(), text[byte..].to_string());
        self.set_text(id, left);
        let right_node = self.create_text(right);
        self.insert_after(id, right_node);
        Some(right_node)
    }

    /// Split `top` at a boundary point inside it. Everything after the point
    /// moves into a shallow copy of `top` inserted right after it; the copy is
    /// returned. Intermediate ancestors are copied the same way.
    pub fn split_tree(&mut self, top: NodeId, at: Position) -> Option<NodeId> {
        if !self.contains(top, at.node) || (top == at.node && self.is_text(top)) {
            return None;
        }
        let (mut container, mut split_index) = if self.is_text(at.node) {
            let parent = self.parent(at.node)?;
            let idx = self.index_in_parent(at.node)?;
            let len = self.node_len(at.node);
            if at.offset == 0 {
                (parent, idx)
            } else {
                if at.offset < len {
                    self.split_text(at.node, at.offset);
                }
                (parent, idx + 1)
            }
        } else {
            (at.node, at.offset)
        };
        loop {
            let copy = self.shallow_clone(container);
            let moved = self
                .children(container)
                .iter()
                .skip(split_index)
                .copied()
                .collect::<Vec<_>>();
            for child in moved {
                self.append_child(copy, child);
            }
            self.insert_after(container, copy);
            if container == top {
                return Some(copy);
            }
            split_index = self.index_in_parent(container)? + 1;
            container = self.parent(container)?;
        }
    }
}

/// Iterator over a node's ancestors.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

/// Byte index of a char offset (clamped to the string length).
pub fn char_to_byte(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(b, _)| b)
        .unwrap_or(s.len())
}

/// Substring by char offsets.
pub fn char_slice(s: &str, from: usize, to: usize) -> &str {
    let start = char_to_byte(s, from);
    let end = char_to_byte(s, to.max(from));
    &s[start..end]
}
