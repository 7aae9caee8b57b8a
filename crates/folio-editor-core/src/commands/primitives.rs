//! Native formatting primitives.
//!
//! The command router never edits formatting itself. It orchestrates the
//! narrow surface below and then normalizes whatever the primitives left
//! behind. [`ModelPrimitives`] implements that surface directly on the
//! arena with execCommand-like semantics, so the same router drives both
//! native tests and the browser host.

use crate::dom::{Document, DomSelection, ElementData, NodeData, NodeId, Position};
use crate::filter::insert_nodes_at;
use crate::platform::PlatformError;
use crate::selection::persist::{self, SavedSelection};
use crate::selection::{editable_text_nodes, get_node_list, get_root_elements};
use crate::tags::{
    INLINE_MARK_TAGS, LINE_BREAK_TAG, LINK_TAG, LIST_ITEM_TAG, PARAGRAPH_TAG, SEPARATOR_TAG,
    TEXT_BLOCK_TAGS, is_list, is_media,
};

use super::{FormatCommand, InlineMark};

/// Everything a primitive may touch: the document, the editable root and
/// the current selection (updated in place).
#[derive(Debug)]
pub struct EditContext<'a> {
    pub doc: &'a mut Document,
    pub root: NodeId,
    pub selection: Option<DomSelection>,
}

impl<'a> EditContext<'a> {
    pub fn new(doc: &'a mut Document, root: NodeId, selection: Option<DomSelection>) -> Self {
        Self {
            doc,
            root,
            selection,
        }
    }

    /// Snapshot the selection as text offsets.
    pub fn save_selection(&self) -> Option<SavedSelection> {
        persist::save(self.doc, self.root, self.selection.as_ref())
    }

    /// Run a structural rewrite, then put the selection back on the same text.
    pub fn preserving_selection<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.save_selection();
        let out = f(self);
        if saved.is_some() {
            self.selection = persist::restore(self.doc, saved.as_ref());
        }
        out
    }
}

/// Capability surface the host platform provides.
pub trait FormattingPrimitives {
    /// Add or remove an inline mark over the selection.
    fn toggle_inline(&self, cx: &mut EditContext<'_>, mark: InlineMark) -> Result<(), PlatformError>;

    /// Turn the selected root blocks into `tag` blocks.
    fn format_block(&self, cx: &mut EditContext<'_>, tag: &str) -> Result<(), PlatformError>;

    /// Turn the selected blocks into a list, or back into paragraphs when
    /// they already are one of that kind.
    fn insert_list(&self, cx: &mut EditContext<'_>, ordered: bool) -> Result<(), PlatformError>;

    /// Move selected list items out of their list.
    fn outdent(&self, cx: &mut EditContext<'_>) -> Result<(), PlatformError>;

    fn create_link(&self, cx: &mut EditContext<'_>, href: &str) -> Result<(), PlatformError>;

    fn unlink(&self, cx: &mut EditContext<'_>) -> Result<(), PlatformError>;

    /// Strip inline marks from the selection.
    fn remove_format(&self, cx: &mut EditContext<'_>) -> Result<(), PlatformError>;

    /// Whether `command` is in effect at the selection.
    fn query_state(&self, cx: &EditContext<'_>, command: &FormatCommand)
    -> Result<bool, PlatformError>;

    /// Anything the router has no special handling for.
    fn exec_native(
        &self,
        cx: &mut EditContext<'_>,
        name: &str,
        value: Option<&str>,
    ) -> Result<(), PlatformError>;
}

/// Formatting primitives implemented on the document model.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelPrimitives;

fn no_selection() -> PlatformError {
    PlatformError::from("no selection inside the editor")
}

/// Nearest ancestor of `node` below `root` whose tag is one of `tags`.
fn ancestor_with_tag(doc: &Document, root: NodeId, node: NodeId, tags: &[&str]) -> Option<NodeId> {
    std::iter::once(node)
        .chain(doc.ancestors(node))
        .take_while(|&n| n != root)
        .find(|&n| doc.has_tag(n, tags))
}

/// Split the text node holding running offset `target` so that a node
/// boundary falls exactly on it.
fn split_at_offset(doc: &mut Document, root: NodeId, target: usize) {
    let mut offset = 0;
    for text in editable_text_nodes(doc, root) {
        let len = doc.node_len(text);
        if target > offset && target < offset + len {
            doc.split_text(text, target - offset);
            return;
        }
        offset += len;
    }
}

/// Make the selection boundaries fall between text nodes and return the
/// text nodes fully inside it.
fn isolate_selected_text(doc: &mut Document, root: NodeId, saved: &SavedSelection) -> Vec<NodeId> {
    split_at_offset(doc, root, saved.end);
    split_at_offset(doc, root, saved.start);
    let mut out = Vec::new();
    let mut offset = 0;
    for text in editable_text_nodes(doc, root) {
        let len = doc.node_len(text);
        if len > 0 && offset >= saved.start && offset + len <= saved.end {
            out.push(text);
        }
        offset += len;
    }
    out
}

/// Text nodes with some overlap with the selection, without splitting.
fn touched_text(doc: &Document, root: NodeId, saved: &SavedSelection) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut offset = 0;
    for text in editable_text_nodes(doc, root) {
        let len = doc.node_len(text);
        if len > 0 && offset < saved.end && offset + len > saved.start {
            out.push(text);
        }
        offset += len;
    }
    out
}

/// An element left with nothing worth keeping by a split.
fn is_hollow(doc: &Document, node: NodeId) -> bool {
    doc.descendants(node).into_iter().all(|n| {
        doc.is_element(n)
            && !doc
                .tag(n)
                .is_some_and(|t| t == LINE_BREAK_TAG || t == SEPARATOR_TAG || is_media(t))
    })
}

fn remove_if_hollow(doc: &mut Document, node: NodeId) {
    if doc.is_live(node) && is_hollow(doc, node) {
        doc.remove(node);
    }
}

/// Lift `text` out of every ancestor mark with one of `tags`, splitting
/// the marks around it.
fn lift_out_of(doc: &mut Document, root: NodeId, text: NodeId, tags: &[&str]) {
    while let Some(mark) = ancestor_with_tag(doc, root, text, tags) {
        if mark == text {
            break;
        }
        if let Some(after) = Position::after(doc, text) {
            if let Some(right) = doc.split_tree(mark, after) {
                remove_if_hollow(doc, right);
            }
        }
        let Some(before) = Position::before(doc, text) else {
            break;
        };
        let Some(middle) = doc.split_tree(mark, before) else {
            break;
        };
        remove_if_hollow(doc, mark);
        doc.unwrap(middle);
    }
}

/// Merge adjacent siblings that are identical inline wrappers.
fn merge_adjacent(doc: &mut Document, parent: NodeId) {
    let mut i = 0;
    while i + 1 < doc.children(parent).len() {
        let children = doc.children(parent);
        let (a, b) = (children[i], children[i + 1]);
        let same = match (doc.data(a), doc.data(b)) {
            (Some(NodeData::Element(x)), Some(NodeData::Element(y))) => {
                x == y && (INLINE_MARK_TAGS.contains(&x.tag.as_str()) || x.tag == LINK_TAG)
            }
            _ => false,
        };
        if same {
            doc.move_children(b, a);
            doc.remove(b);
        } else {
            i += 1;
        }
    }
    doc.normalize(parent);
}

fn wrap_text_nodes(doc: &mut Document, texts: &[NodeId], element: &ElementData) {
    let mut parents = Vec::new();
    for &text in texts {
        let wrapper = doc.create_element(&element.tag);
        for (name, value) in &element.attrs {
            doc.set_attr(wrapper, name, value);
        }
        doc.insert_before(text, wrapper);
        doc.append_child(wrapper, text);
        if let Some(parent) = doc.parent(wrapper) {
            if !parents.contains(&parent) {
                parents.push(parent);
            }
        }
    }
    for parent in parents {
        merge_adjacent(doc, parent);
    }
}

fn ensure_not_empty(doc: &mut Document, el: NodeId) {
    if doc.children(el).is_empty() {
        let br = doc.create_element(LINE_BREAK_TAG);
        doc.append_child(el, br);
    }
}

/// Replace a list by one `tag` block per item.
fn unlist(doc: &mut Document, list: NodeId, tag: &str) {
    for item in doc.children(list).to_vec() {
        let block = doc.create_element(tag);
        doc.move_children(item, block);
        ensure_not_empty(doc, block);
        doc.insert_before(list, block);
    }
    doc.remove(list);
}

fn is_listable(doc: &Document, block: NodeId) -> bool {
    doc.has_tag(block, TEXT_BLOCK_TAGS) || doc.tag(block).is_some_and(is_list)
}

impl FormattingPrimitives for ModelPrimitives {
    fn toggle_inline(&self, cx: &mut EditContext<'_>, mark: InlineMark) -> Result<(), PlatformError> {
        let saved = cx.save_selection().ok_or_else(no_selection)?;
        if saved.is_collapsed() {
            tracing::trace!(target: "folio::commands", ?mark, "collapsed selection, nothing to mark");
            return Ok(());
        }
        let active = self.query_state(cx, &mark.into())?;
        let texts = isolate_selected_text(cx.doc, cx.root, &saved);
        if active {
            for text in texts {
                lift_out_of(cx.doc, cx.root, text, mark.tags());
            }
        } else {
            let unmarked: Vec<NodeId> = texts
                .into_iter()
                .filter(|&t| ancestor_with_tag(cx.doc, cx.root, t, mark.tags()).is_none())
                .collect();
            let element = ElementData {
                tag: mark.tag().into(),
                attrs: Vec::new(),
            };
            wrap_text_nodes(cx.doc, &unmarked, &element);
        }
        cx.doc.normalize(cx.root);
        cx.selection = persist::restore(cx.doc, Some(&saved));
        Ok(())
    }

    fn format_block(&self, cx: &mut EditContext<'_>, tag: &str) -> Result<(), PlatformError> {
        let blocks = get_root_elements(cx.doc, cx.root, cx.selection.as_ref());
        if blocks.is_empty() {
            return Err(no_selection());
        }
        cx.preserving_selection(|cx| {
            for block in blocks {
                if cx.doc.tag(block).is_some_and(is_list) {
                    unlist(cx.doc, block, tag);
                } else if cx.doc.has_tag(block, TEXT_BLOCK_TAGS) {
                    cx.doc.rename(block, tag);
                }
            }
        });
        Ok(())
    }

    fn insert_list(&self, cx: &mut EditContext<'_>, ordered: bool) -> Result<(), PlatformError> {
        let tag = if ordered { "ol" } else { "ul" };
        let blocks = get_root_elements(cx.doc, cx.root, cx.selection.as_ref());
        if blocks.is_empty() {
            return Err(no_selection());
        }
        cx.preserving_selection(|cx| {
            let doc = &mut *cx.doc;
            if blocks.iter().all(|&b| doc.has_tag(b, &[tag])) {
                for list in blocks {
                    unlist(doc, list, PARAGRAPH_TAG);
                }
                return;
            }

            let mut runs: Vec<Vec<NodeId>> = vec![Vec::new()];
            for block in blocks {
                if is_listable(doc, block) {
                    if let Some(run) = runs.last_mut() {
                        run.push(block);
                    }
                } else {
                    runs.push(Vec::new());
                }
            }
            for run in runs.into_iter().filter(|r| !r.is_empty()) {
                let list = doc.create_element(tag);
                doc.insert_before(run[0], list);
                for block in run {
                    if doc.tag(block).is_some_and(is_list) {
                        doc.move_children(block, list);
                    } else {
                        let item = doc.create_element(LIST_ITEM_TAG);
                        doc.move_children(block, item);
                        ensure_not_empty(doc, item);
                        doc.append_child(list, item);
                    }
                    doc.remove(block);
                }
                if let Some(next) = doc.next_sibling(list) {
                    if doc.has_tag(next, &[tag]) {
                        doc.move_children(next, list);
                        doc.remove(next);
                    }
                }
                if let Some(prev) = doc.prev_sibling(list) {
                    if doc.has_tag(prev, &[tag]) {
                        doc.move_children(list, prev);
                        doc.remove(list);
                    }
                }
            }
        });
        Ok(())
    }

    fn outdent(&self, cx: &mut EditContext<'_>) -> Result<(), PlatformError> {
        let selection = cx.selection.ok_or_else(no_selection)?;
        let range = selection.to_range(cx.doc);
        let items: Vec<NodeId> = get_root_elements(cx.doc, cx.root, Some(&selection))
            .into_iter()
            .filter(|&b| cx.doc.tag(b).is_some_and(is_list))
            .flat_map(|list| cx.doc.children(list).to_vec())
            .filter(|&item| {
                cx.doc.has_tag(item, &[LIST_ITEM_TAG]) && range.intersects_node(cx.doc, item)
            })
            .collect();
        if items.is_empty() {
            return Ok(());
        }
        cx.preserving_selection(|cx| {
            let doc = &mut *cx.doc;
            for item in items.into_iter().rev() {
                let Some(list) = doc.parent(item) else {
                    continue;
                };
                let rest: Vec<NodeId> = doc
                    .children(list)
                    .iter()
                    .skip_while(|&&c| c != item)
                    .skip(1)
                    .copied()
                    .collect();
                if !rest.is_empty() {
                    let tail = doc.shallow_clone(list);
                    for node in rest {
                        doc.append_child(tail, node);
                    }
                    doc.insert_after(list, tail);
                }
                let block = doc.create_element(PARAGRAPH_TAG);
                doc.move_children(item, block);
                ensure_not_empty(doc, block);
                doc.insert_after(list, block);
                doc.remove(item);
                if doc.children(list).is_empty() {
                    doc.remove(list);
                }
            }
        });
        Ok(())
    }

    fn create_link(&self, cx: &mut EditContext<'_>, href: &str) -> Result<(), PlatformError> {
        let selection = cx.selection.ok_or_else(no_selection)?;
        if selection.is_collapsed() {
            let fragment = cx.doc.create_fragment();
            let link = cx.doc.create_element_with_attrs(LINK_TAG, &[("href", href)]);
            let text = cx.doc.create_text(href);
            cx.doc.append_child(link, text);
            cx.doc.append_child(fragment, link);
            let after = insert_nodes_at(cx.doc, selection.anchor, fragment);
            cx.doc.remove(fragment);
            cx.selection = Some(DomSelection::collapsed(after));
            return Ok(());
        }
        let saved = cx.save_selection().ok_or_else(no_selection)?;
        let texts = isolate_selected_text(cx.doc, cx.root, &saved);
        let mut bare = Vec::new();
        for text in texts {
            match ancestor_with_tag(cx.doc, cx.root, text, &[LINK_TAG]) {
                Some(link) => cx.doc.set_attr(link, "href", href),
                None => bare.push(text),
            }
        }
        let element = ElementData {
            tag: LINK_TAG.into(),
            attrs: vec![("href".into(), href.to_string())],
        };
        wrap_text_nodes(cx.doc, &bare, &element);
        cx.doc.normalize(cx.root);
        cx.selection = persist::restore(cx.doc, Some(&saved));
        Ok(())
    }

    fn unlink(&self, cx: &mut EditContext<'_>) -> Result<(), PlatformError> {
        let saved = cx.save_selection().ok_or_else(no_selection)?;
        let mut links: Vec<NodeId> = get_node_list(cx.doc, cx.root, cx.selection.as_ref(), false)
            .into_iter()
            .filter(|&n| cx.doc.has_tag(n, &[LINK_TAG]))
            .collect();
        for text in touched_text(cx.doc, cx.root, &saved) {
            if let Some(link) = ancestor_with_tag(cx.doc, cx.root, text, &[LINK_TAG]) {
                if !links.contains(&link) {
                    links.push(link);
                }
            }
        }
        for link in links {
            cx.doc.unwrap(link);
        }
        cx.doc.normalize(cx.root);
        cx.selection = persist::restore(cx.doc, Some(&saved));
        Ok(())
    }

    fn remove_format(&self, cx: &mut EditContext<'_>) -> Result<(), PlatformError> {
        let saved = cx.save_selection().ok_or_else(no_selection)?;
        if saved.is_collapsed() {
            return Ok(());
        }
        for text in isolate_selected_text(cx.doc, cx.root, &saved) {
            lift_out_of(cx.doc, cx.root, text, INLINE_MARK_TAGS);
        }
        cx.doc.normalize(cx.root);
        cx.selection = persist::restore(cx.doc, Some(&saved));
        Ok(())
    }

    fn query_state(
        &self,
        cx: &EditContext<'_>,
        command: &FormatCommand,
    ) -> Result<bool, PlatformError> {
        let selection = cx.selection.ok_or_else(no_selection)?;
        let doc = &*cx.doc;
        let anchor_has = |tags: &[&str]| {
            ancestor_with_tag(doc, cx.root, selection.anchor.node, tags).is_some()
        };
        let context_has = |tags: &[&str]| {
            get_node_list(doc, cx.root, Some(&selection), false)
                .into_iter()
                .any(|n| doc.has_tag(n, tags))
        };
        let state = match command {
            FormatCommand::Block(kind) => {
                let tag = kind.tag();
                if tag == PARAGRAPH_TAG {
                    get_root_elements(doc, cx.root, Some(&selection))
                        .first()
                        .is_some_and(|&b| doc.has_tag(b, &[PARAGRAPH_TAG]))
                } else {
                    context_has(&[tag])
                }
            }
            FormatCommand::OrderedList => context_has(&["ol"]),
            FormatCommand::UnorderedList => context_has(&["ul"]),
            FormatCommand::Link => context_has(&[LINK_TAG]),
            FormatCommand::RemoveFormat | FormatCommand::Native(_) => false,
            inline => {
                let Some(mark) = inline.inline_mark() else {
                    return Ok(false);
                };
                let saved = persist::save(doc, cx.root, Some(&selection)).ok_or_else(no_selection)?;
                if saved.is_collapsed() {
                    anchor_has(mark.tags())
                } else {
                    let touched = touched_text(doc, cx.root, &saved);
                    !touched.is_empty()
                        && touched.into_iter().all(|t| {
                            doc.text(t).is_some_and(|s| s.trim().is_empty())
                                || ancestor_with_tag(doc, cx.root, t, mark.tags()).is_some()
                        })
                }
            }
        };
        Ok(state)
    }

    fn exec_native(
        &self,
        cx: &mut EditContext<'_>,
        name: &str,
        _value: Option<&str>,
    ) -> Result<(), PlatformError> {
        match name.to_ascii_lowercase().as_str() {
            "inserthorizontalrule" => {
                let blocks = get_root_elements(cx.doc, cx.root, cx.selection.as_ref());
                let hr = cx.doc.create_element(SEPARATOR_TAG);
                match blocks.last() {
                    Some(&block) => cx.doc.insert_after(block, hr),
                    None => cx.doc.append_child(cx.root, hr),
                }
                Ok(())
            }
            _ => Err(PlatformError(format!("unsupported native command `{name}`"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::BlockKind;
    use crate::dom::{inner_html, parse_fragment};

    fn setup(html: &str, start: usize, end: usize) -> (Document, NodeId, Option<DomSelection>) {
        let mut doc = Document::new();
        let root = parse_fragment(&mut doc, html);
        let saved = SavedSelection {
            container: root,
            start,
            end,
            end_container: None,
        };
        let selection = persist::restore(&doc, Some(&saved));
        (doc, root, selection)
    }

    fn selected(cx: &EditContext<'_>) -> String {
        cx.selection
            .map(|s| s.to_range(cx.doc).to_string(cx.doc))
            .unwrap_or_default()
    }

    #[test]
    fn test_toggle_bold_on_and_off() {
        let (mut doc, root, selection) = setup("<p>hello world</p>", 6, 11);
        let mut cx = EditContext::new(&mut doc, root, selection);
        ModelPrimitives.toggle_inline(&mut cx, InlineMark::Bold).unwrap();
        assert_eq!(inner_html(cx.doc, root), "<p>hello <b>world</b></p>");
        assert_eq!(selected(&cx), "world");
        assert!(ModelPrimitives.query_state(&cx, &FormatCommand::Bold).unwrap());

        ModelPrimitives.toggle_inline(&mut cx, InlineMark::Bold).unwrap();
        assert_eq!(inner_html(cx.doc, root), "<p>hello world</p>");
        assert_eq!(selected(&cx), "world");
    }

    #[test]
    fn test_unbold_middle_of_mark() {
        let (mut doc, root, selection) = setup("<p><b>abcdef</b></p>", 2, 4);
        let mut cx = EditContext::new(&mut doc, root, selection);
        assert!(ModelPrimitives.query_state(&cx, &FormatCommand::Bold).unwrap());
        ModelPrimitives.toggle_inline(&mut cx, InlineMark::Bold).unwrap();
        assert_eq!(inner_html(cx.doc, root), "<p><b>ab</b>cd<b>ef</b></p>");
        assert_eq!(selected(&cx), "cd");
    }

    #[test]
    fn test_bold_synonym_counts_as_active() {
        let (mut doc, root, selection) = setup("<p><strong>abc</strong></p>", 0, 3);
        let cx = EditContext::new(&mut doc, root, selection);
        assert!(ModelPrimitives.query_state(&cx, &FormatCommand::Bold).unwrap());
        assert!(!ModelPrimitives.query_state(&cx, &FormatCommand::Italic).unwrap());
    }

    #[test]
    fn test_partial_mark_is_not_active_and_extends() {
        let (mut doc, root, selection) = setup("<p>ab<i>cd</i>ef</p>", 1, 5);
        let mut cx = EditContext::new(&mut doc, root, selection);
        assert!(!ModelPrimitives.query_state(&cx, &FormatCommand::Italic).unwrap());
        ModelPrimitives.toggle_inline(&mut cx, InlineMark::Italic).unwrap();
        assert_eq!(inner_html(cx.doc, root), "<p>a<i>bcde</i>f</p>");
    }

    #[test]
    fn test_format_block_renames_selected_blocks() {
        let (mut doc, root, selection) = setup("<p>one</p><p>two</p><p>three</p>", 1, 4);
        let mut cx = EditContext::new(&mut doc, root, selection);
        ModelPrimitives.format_block(&mut cx, "h2").unwrap();
        assert_eq!(inner_html(cx.doc, root), "<h2>one</h2><h2>two</h2><p>three</p>");
        assert!(
            ModelPrimitives
                .query_state(&cx, &FormatCommand::Block(BlockKind::Heading(2)))
                .unwrap()
        );
    }

    #[test]
    fn test_insert_list_and_toggle_back() {
        let (mut doc, root, selection) = setup("<p>one</p><h3>two</h3>", 0, 4);
        let mut cx = EditContext::new(&mut doc, root, selection);
        ModelPrimitives.insert_list(&mut cx, false).unwrap();
        assert_eq!(inner_html(cx.doc, root), "<ul><li>one</li><li>two</li></ul>");
        assert_eq!(selected(&cx), "onet");

        ModelPrimitives.insert_list(&mut cx, false).unwrap();
        assert_eq!(inner_html(cx.doc, root), "<p>one</p><p>two</p>");
    }

    #[test]
    fn test_insert_list_joins_adjacent_list() {
        let (mut doc, root, selection) = setup("<ol><li>a</li></ol><p>b</p>", 1, 1);
        let mut cx = EditContext::new(&mut doc, root, selection);
        cx.selection = persist::restore(
            cx.doc,
            Some(&SavedSelection {
                container: root,
                start: 2,
                end: 2,
                end_container: None,
            }),
        );
        ModelPrimitives.insert_list(&mut cx, true).unwrap();
        assert_eq!(inner_html(cx.doc, root), "<ol><li>a</li><li>b</li></ol>");
    }

    #[test]
    fn test_outdent_splits_list() {
        let (mut doc, root, selection) = setup("<ul><li>a</li><li>b</li><li>c</li></ul>", 2, 2);
        let mut cx = EditContext::new(&mut doc, root, selection);
        ModelPrimitives.outdent(&mut cx).unwrap();
        assert_eq!(
            inner_html(cx.doc, root),
            "<ul><li>a</li></ul><p>b</p><ul><li>c</li></ul>"
        );
        let caret = cx.selection.unwrap().anchor;
        assert_eq!(cx.doc.text(caret.node), Some("b"));
    }

    #[test]
    fn test_create_and_remove_link() {
        let (mut doc, root, selection) = setup("<p>see docs here</p>", 4, 8);
        let mut cx = EditContext::new(&mut doc, root, selection);
        ModelPrimitives.create_link(&mut cx, "https://docs.example").unwrap();
        assert_eq!(
            inner_html(cx.doc, root),
            r#"<p>see <a href="https://docs.example">docs</a> here</p>"#
        );
        assert!(ModelPrimitives.query_state(&cx, &FormatCommand::Link).unwrap());

        ModelPrimitives.unlink(&mut cx).unwrap();
        assert_eq!(inner_html(cx.doc, root), "<p>see docs here</p>");
    }

    #[test]
    fn test_collapsed_link_inserts_url_text() {
        let (mut doc, root, selection) = setup("<p>ab</p>", 1, 1);
        let mut cx = EditContext::new(&mut doc, root, selection);
        ModelPrimitives.create_link(&mut cx, "http://x.io").unwrap();
        assert_eq!(
            inner_html(cx.doc, root),
            r#"<p>a<a href="http://x.io">http://x.io</a>b</p>"#
        );
    }

    #[test]
    fn test_remove_format_keeps_links() {
        let (mut doc, root, selection) =
            setup(r#"<p><b><i>ab</i></b><a href="/x"><u>cd</u></a></p>"#, 0, 4);
        let mut cx = EditContext::new(&mut doc, root, selection);
        ModelPrimitives.remove_format(&mut cx).unwrap();
        assert_eq!(inner_html(cx.doc, root), r#"<p>ab<a href="/x">cd</a></p>"#);
    }

    #[test]
    fn test_unknown_native_command_errors() {
        let (mut doc, root, selection) = setup("<p>ab</p>", 1, 1);
        let mut cx = EditContext::new(&mut doc, root, selection);
        assert!(ModelPrimitives.exec_native(&mut cx, "justifyCenter", None).is_err());
        ModelPrimitives
            .exec_native(&mut cx, "insertHorizontalRule", None)
            .unwrap();
        assert_eq!(inner_html(cx.doc, root), "<p>ab</p><hr>");
    }

    #[test]
    fn test_no_selection_is_an_error() {
        let (mut doc, root, _) = setup("<p>ab</p>", 0, 0);
        let cx = EditContext::new(&mut doc, root, None);
        assert!(ModelPrimitives.query_state(&cx, &FormatCommand::Bold).is_err());
    }
}
