//! Block normalization.
//!
//! The document is a flat run of blocks directly under the root: no block
//! nests inside another (list items aside), loose inline content is wrapped
//! in paragraphs, and media sits alone inside non-editable holders. These
//! passes restore that shape after native editing, pasting or formatting.

use std::collections::HashSet;

use crate::dom::{CONTENTEDITABLE_ATTR, Document, DomRange, NodeId, Position};
use crate::selection::context::root_block_of;
use crate::tags::{
    BAD_ATTRIBUTES, LINE_BREAK_TAG, LIST_ITEM_TAG, MEDIA_HOLDER_TAG, PARAGRAPH_TAG,
    SEPARATOR_TAG, SPAN_TAG, is_block, is_list, is_media,
};

fn is_block_node(doc: &Document, node: NodeId) -> bool {
    doc.tag(node).is_some_and(is_block)
}

/// Nodes that stay at root level without being wrapped in a paragraph:
/// blocks, separators and non-editable containers such as media holders.
/// A plain editable `div` is loose content like any other wrapper.
fn is_root_level(doc: &Document, node: NodeId) -> bool {
    match doc.tag(node) {
        Some(tag) => is_block(tag) || tag == SEPARATOR_TAG || doc.is_non_editable(node),
        None => false,
    }
}

fn is_whitespace_text(doc: &Document, node: NodeId) -> bool {
    doc.text(node).is_some_and(|t| t.trim().is_empty())
}

/// Wrap every run of loose inline content at root level in a paragraph.
/// Runs made only of whitespace text are dropped.
pub fn blockify(doc: &mut Document, root: NodeId) {
    doc.normalize(root);

    let mut runs: Vec<Vec<NodeId>> = Vec::new();
    let mut current: Vec<NodeId> = Vec::new();
    for &child in doc.children(root) {
        if is_root_level(doc, child) {
            if !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
        } else {
            current.push(child);
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }

    for run in runs {
        if run.iter().all(|&n| is_whitespace_text(doc, n)) {
            for node in run {
                doc.remove(node);
            }
            continue;
        }
        let p = doc.create_element(PARAGRAPH_TAG);
        doc.insert_before(run[0], p);
        for node in run {
            doc.append_child(p, node);
        }
    }
}

/// Bring every nested block up to root level.
///
/// With `preserve_inline`, content without any block elements is left
/// alone instead of being wrapped in a paragraph. Running it twice gives the
/// same result as running it once.
pub fn flatten_blocks_down(doc: &mut Document, root: NodeId, preserve_inline: bool) {
    let has_blocks = doc
        .descendants(root)
        .into_iter()
        .any(|n| is_block_node(doc, n) || doc.is_non_editable(n));
    if preserve_inline && !has_blocks {
        return;
    }

    blockify(doc, root);

    // Pre-order walk that does not enter opaque subtrees.
    let mut survivors = Vec::new();
    let mut had_nested_blocks = HashSet::new();
    let mut stack: Vec<NodeId> = doc.children(root).iter().rev().copied().collect();
    while let Some(node) = stack.pop() {
        let opaque = doc.is_non_editable(node);
        if opaque || is_block_node(doc, node) || doc.has_tag(node, &[SEPARATOR_TAG]) {
            survivors.push(node);
            if !opaque
                && doc
                    .descendants(node)
                    .into_iter()
                    .any(|d| is_block_node(doc, d))
            {
                had_nested_blocks.insert(node);
            }
        }
        if !opaque {
            stack.extend(doc.children(node).iter().rev().copied());
        }
    }

    for &node in &survivors {
        doc.append_child(root, node);
    }
    let keep: HashSet<NodeId> = survivors.iter().copied().collect();
    for child in doc.children(root).to_vec() {
        if !keep.contains(&child) {
            doc.remove(child);
        }
    }
    for node in survivors {
        if had_nested_blocks.contains(&node) && is_empty_element(doc, node, true) {
            doc.remove(node);
        }
    }
    tracing::debug!(target: "folio::filter", blocks = doc.children(root).len(), "flattened blocks");
}

/// Unwrap every nested block inside `root`, leaving its content inline.
/// Does nothing for non-editable roots.
pub fn un_block(doc: &mut Document, root: NodeId) {
    if doc.is_non_editable(root) {
        return;
    }
    while let Some(child) = doc
        .children(root)
        .iter()
        .copied()
        .find(|&c| is_block_node(doc, c) && !doc.is_non_editable(c))
    {
        doc.unwrap(child);
    }
}

/// Keep the innermost block of `node_list` (nearest first) and unwrap every
/// block containing it, re-blockifying the root when content lands there.
pub fn unwrap_parent_blocks(doc: &mut Document, root: NodeId, node_list: &[NodeId]) {
    let mut blocks = node_list
        .iter()
        .copied()
        .filter(|&n| n != root && doc.is_live(n) && is_block_node(doc, n));
    if blocks.next().is_none() {
        return;
    }
    for block in blocks.collect::<Vec<_>>() {
        if !doc.is_live(block) {
            continue;
        }
        let parent = doc.parent(block);
        doc.unwrap(block);
        if parent == Some(root) {
            blockify(doc, root);
        }
    }
}

/// Unwrap spans and strip injected attributes in and under `nodes`.
///
/// Returns whether any span was removed, which can invalidate a saved
/// selection that is not a caret.
pub fn scrub_spans_and_bad_attrs(doc: &mut Document, nodes: &[NodeId]) -> bool {
    let mut spans = Vec::new();
    let mut seen = HashSet::new();
    for &node in nodes {
        if !doc.is_live(node) {
            continue;
        }
        for n in std::iter::once(node).chain(doc.descendants(node)) {
            if !seen.insert(n) || !doc.is_element(n) {
                continue;
            }
            for attr in BAD_ATTRIBUTES {
                doc.remove_attr(n, attr);
            }
            if doc.has_tag(n, &[SPAN_TAG]) {
                spans.push(n);
            }
        }
    }
    let mut removed = false;
    for span in spans {
        if doc.is_live(span) && doc.parent(span).is_some() {
            doc.unwrap(span);
            removed = true;
        }
    }
    removed
}

fn has_media(doc: &Document, el: NodeId) -> bool {
    std::iter::once(el).chain(doc.descendants(el)).any(|n| {
        doc.tag(n)
            .is_some_and(|t| is_media(t) || t == SEPARATOR_TAG)
    })
}

/// Whether `el` has no text (optionally ignoring whitespace) and no media.
pub fn is_empty_element(doc: &Document, el: NodeId, trim: bool) -> bool {
    let text = doc.text_content(el);
    let empty = if trim {
        text.trim().is_empty()
    } else {
        text.is_empty()
    };
    empty && !has_media(doc, el)
}

fn ensure_single_trailing_break(doc: &mut Document, el: NodeId) {
    while let Some(last) = doc.last_child(el) {
        if doc.has_tag(last, &[LINE_BREAK_TAG]) || is_whitespace_text(doc, last) {
            doc.remove(last);
        } else {
            break;
        }
    }
    let br = doc.create_element(LINE_BREAK_TAG);
    doc.append_child(el, br);
}

/// Turn block content under `root` into inline content, optionally ending
/// each former block with one line break.
pub fn inlinify(doc: &mut Document, root: NodeId, add_trailing_break: bool) {
    let blocks: Vec<NodeId> = doc
        .descendants(root)
        .into_iter()
        .filter(|&n| is_block_node(doc, n))
        .collect();
    for block in blocks {
        if !doc.is_live(block) {
            continue;
        }
        if doc.tag(block).is_some_and(is_list) {
            for item in doc.children(block).to_vec() {
                if !doc.has_tag(item, &[LIST_ITEM_TAG]) {
                    continue;
                }
                if add_trailing_break {
                    ensure_single_trailing_break(doc, item);
                }
                doc.unwrap(item);
            }
        } else if add_trailing_break {
            ensure_single_trailing_break(doc, block);
        }
        doc.unwrap(block);
    }
}

/// Whether `node` is a media holder.
pub fn is_media_holder(doc: &Document, node: NodeId, holder_class: &str) -> bool {
    doc.has_tag(node, &[MEDIA_HOLDER_TAG]) && doc.has_class(node, holder_class)
}

/// Create an empty, non-editable media holder.
pub fn create_media_holder(doc: &mut Document, holder_class: &str) -> NodeId {
    let holder = doc.create_element(MEDIA_HOLDER_TAG);
    doc.set_attr(holder, "class", holder_class);
    doc.set_attr(holder, CONTENTEDITABLE_ATTR, "false");
    holder
}

/// Move every unwrapped media element (and separator) into its own holder
/// at root level. The block holding the media is split around it and the
/// holder goes between the halves; halves left empty are removed. Returns
/// the new holders.
pub fn wrap_media(doc: &mut Document, root: NodeId, holder_class: &str) -> Vec<NodeId> {
    let media: Vec<NodeId> = doc
        .descendants(root)
        .into_iter()
        .filter(|&n| {
            doc.tag(n)
                .is_some_and(|t| is_media(t) || t == SEPARATOR_TAG)
        })
        .filter(|&n| {
            !doc.ancestors(n).take_while(|&a| a != root).any(|a| {
                doc.is_non_editable(a) || doc.tag(a).is_some_and(is_media)
            })
        })
        .collect();

    let mut holders = Vec::new();
    for node in media {
        let holder = create_media_holder(doc, holder_class);
        if doc.parent(node) == Some(root) {
            doc.insert_before(node, holder);
            doc.append_child(holder, node);
        } else {
            let Some(block) = root_block_of(doc, root, node) else {
                continue;
            };
            let (Some(parent), Some(index)) = (doc.parent(node), doc.index_in_parent(node)) else {
                continue;
            };
            let rest = doc.split_tree(block, Position::new(parent, index));
            doc.insert_after(block, holder);
            doc.append_child(holder, node);
            for half in std::iter::once(block).chain(rest) {
                if is_empty_element(doc, half, true) {
                    doc.remove(half);
                }
            }
        }
        holders.push(holder);
    }

    if !holders.is_empty() {
        tracing::debug!(target: "folio::filter", count = holders.len(), "wrapped media");
    }
    holders
}

/// Unwrap every media holder under `root`.
pub fn unwrap_media_holders(doc: &mut Document, root: NodeId, holder_class: &str) {
    let holders: Vec<NodeId> = doc
        .descendants(root)
        .into_iter()
        .filter(|&n| is_media_holder(doc, n, holder_class))
        .collect();
    for holder in holders {
        doc.unwrap(holder);
    }
}

/// Guarantee at least one block: an empty root gets `<p><br></p>`.
/// Returns whether the placeholder block was inserted.
pub fn ensure_minimum_block(doc: &mut Document, root: NodeId) -> bool {
    let has_element = doc.children(root).iter().any(|&c| doc.is_element(c));
    if has_element {
        return false;
    }
    doc.remove_children(root);
    let p = doc.create_element(PARAGRAPH_TAG);
    let br = doc.create_element(LINE_BREAK_TAG);
    doc.append_child(p, br);
    doc.append_child(root, p);
    true
}

/// Remove empty blocks at the start and end of the document. Empty blocks
/// between content are kept.
pub fn trim_empty_blocks(doc: &mut Document, root: NodeId) {
    while let Some(first) = doc.first_child(root) {
        if !is_empty_element(doc, first, true) {
            break;
        }
        doc.remove(first);
    }
    while let Some(last) = doc.last_child(root) {
        if !is_empty_element(doc, last, true) {
            break;
        }
        doc.remove(last);
    }
}

/// Delete the content of `range` and merge the blocks at its edges.
/// Returns the collapsed position where the content was.
pub fn delete_contents(doc: &mut Document, root: NodeId, range: DomRange) -> Position {
    if range.is_collapsed() {
        return range.start;
    }
    let start_block = root_block_of(doc, root, range.start.node);
    let end_block = root_block_of(doc, root, range.end.node);

    let mut doomed = Vec::new();
    let mut stack: Vec<NodeId> = doc.children(root).iter().rev().copied().collect();
    while let Some(node) = stack.pop() {
        if node != range.start.node && node != range.end.node && range.contains_node(doc, node) {
            doomed.push(node);
        } else {
            stack.extend(doc.children(node).iter().rev().copied());
        }
    }
    for node in doomed {
        doc.remove(node);
    }

    let start_text = doc.text(range.start.node).map(str::to_string);
    let end_text = doc.text(range.end.node).map(str::to_string);
    if range.start.node == range.end.node {
        if let Some(text) = start_text {
            let kept = format!(
                "{}{}",
                crate::dom::char_slice(&text, 0, range.start.offset),
                crate::dom::char_slice(&text, range.end.offset, usize::MAX)
            );
            doc.set_text(range.start.node, kept);
        }
    } else {
        if let Some(text) = start_text {
            let kept = crate::dom::char_slice(&text, 0, range.start.offset).to_string();
            doc.set_text(range.start.node, kept);
        }
        if let Some(text) = end_text {
            let kept = crate::dom::char_slice(&text, range.end.offset, usize::MAX).to_string();
            doc.set_text(range.end.node, kept);
        }
    }

    if let (Some(start_block), Some(end_block)) = (start_block, end_block) {
        if start_block != end_block && doc.is_live(start_block) && doc.is_live(end_block) {
            doc.move_children(end_block, start_block);
            doc.remove(end_block);
        }
    }
    range.start
}

/// Insert the children of `fragment` at `at`, splitting a text node if
/// needed. Returns the position right after the inserted content.
pub fn insert_nodes_at(doc: &mut Document, at: Position, fragment: NodeId) -> Position {
    let (parent, mut index) = match doc.text(at.node) {
        Some(text) => {
            let len = text.chars().count();
            let (Some(parent), Some(idx)) = (doc.parent(at.node), doc.index_in_parent(at.node))
            else {
                return at;
            };
            if at.offset == 0 {
                (parent, idx)
            } else {
                if at.offset < len {
                    doc.split_text(at.node, at.offset);
                }
                (parent, idx + 1)
            }
        }
        None => (at.node, at.offset),
    };

    let mut last = None;
    for child in doc.children(fragment).to_vec() {
        doc.insert_child(parent, index, child);
        index += 1;
        last = Some(child);
    }
    match last {
        Some(node) if doc.is_text(node) => Position::new(node, doc.node_len(node)),
        _ => Position::new(parent, index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{inner_html, parse_fragment};

    const HOLDER: &str = "folio-media";

    fn run(html: &str, f: impl FnOnce(&mut Document, NodeId)) -> String {
        let mut doc = Document::new();
        let root = parse_fragment(&mut doc, html);
        f(&mut doc, root);
        inner_html(&doc, root)
    }

    #[test]
    fn test_blockify_wraps_inline_runs() {
        insta::assert_snapshot!(
            run("Hello <b>you</b><p>block</p>  <hr>tail", blockify),
            @"<p>Hello <b>you</b></p><p>block</p><hr><p>tail</p>"
        );
    }

    #[test]
    fn test_flatten_nested_blocks() {
        insta::assert_snapshot!(
            run(
                "<blockquote><p>one</p>x<p>two</p></blockquote><ul><li><h2>head</h2>tail</li></ul>",
                |d, r| flatten_blocks_down(d, r, false)
            ),
            @"<blockquote>x</blockquote><p>one</p><p>two</p><ul><li>tail</li></ul><h2>head</h2>"
        );
    }

    #[test]
    fn test_flatten_preserves_inline_when_asked() {
        assert_eq!(
            run("just <i>text</i>", |d, r| flatten_blocks_down(d, r, true)),
            "just <i>text</i>"
        );
        assert_eq!(
            run("just <i>text</i>", |d, r| flatten_blocks_down(d, r, false)),
            "<p>just <i>text</i></p>"
        );
    }

    #[test]
    fn test_flatten_is_idempotent() {
        let inputs = [
            "<blockquote><p>one</p>x<p>two</p></blockquote>",
            "<ul><li><p>a</p></li><li>b</li></ul>",
            "<div><div><p></p><h1>t</h1></div></div>text",
            r#"<p>a</p><div class="folio-media" contenteditable="false"><p>in</p></div>"#,
            "<p><img src=\"a.png\"></p><hr>",
        ];
        for input in inputs {
            let mut doc = Document::new();
            let root = parse_fragment(&mut doc, input);
            flatten_blocks_down(&mut doc, root, false);
            let once = inner_html(&doc, root);
            flatten_blocks_down(&mut doc, root, false);
            assert_eq!(inner_html(&doc, root), once, "input: {input}");
        }
    }

    #[test]
    fn test_flatten_keeps_non_editable_contents() {
        assert_eq!(
            run(
                r#"<div contenteditable="false"><p>kept</p></div>"#,
                |d, r| flatten_blocks_down(d, r, false)
            ),
            r#"<div contenteditable="false"><p>kept</p></div>"#
        );
    }

    #[test]
    fn test_un_block() {
        let mut doc = Document::new();
        let root = parse_fragment(&mut doc, "<blockquote><p>a</p><p>b<h2>c</h2></p></blockquote>");
        let quote = doc.first_child(root).unwrap();
        un_block(&mut doc, quote);
        assert_eq!(inner_html(&doc, root), "<blockquote>abc</blockquote>");
    }

    #[test]
    fn test_unwrap_parent_blocks() {
        let mut doc = Document::new();
        let root = parse_fragment(&mut doc, "<blockquote>before<ol><li>item</li></ol></blockquote>");
        let text = doc.text_nodes(root)[1];
        let list = crate::selection::get_parent_nodes(&doc, root, text);
        unwrap_parent_blocks(&mut doc, root, &list);
        assert_eq!(
            inner_html(&doc, root),
            "<p>before</p><ol><li>item</li></ol>"
        );
    }

    #[test]
    fn test_scrub_spans() {
        let mut doc = Document::new();
        let root = parse_fragment(
            &mut doc,
            r#"<p style="color:red" dir="rtl">a<span style="x">b</span><b dir="ltr">c</b></p>"#,
        );
        let p = doc.first_child(root).unwrap();
        assert!(scrub_spans_and_bad_attrs(&mut doc, &[p]));
        assert_eq!(inner_html(&doc, root), "<p>ab<b>c</b></p>");
        assert!(!scrub_spans_and_bad_attrs(&mut doc, &[p]));
    }

    #[test]
    fn test_is_empty_element() {
        let mut doc = Document::new();
        let root = parse_fragment(&mut doc, "<p> </p><p><br></p><p><img src=\"x\"></p><hr>");
        let kids = doc.children(root).to_vec();
        assert!(!is_empty_element(&doc, kids[0], false));
        assert!(is_empty_element(&doc, kids[0], true));
        assert!(is_empty_element(&doc, kids[1], false));
        assert!(!is_empty_element(&doc, kids[2], true));
        assert!(!is_empty_element(&doc, kids[3], true));
    }

    #[test]
    fn test_inlinify() {
        assert_eq!(
            run("<p>a<br></p><ul><li>b</li><li>c</li></ul>", |d, r| inlinify(d, r, true)),
            "a<br>b<br>c<br>"
        );
        assert_eq!(
            run("<h2>a</h2><p>b</p>", |d, r| inlinify(d, r, false)),
            "ab"
        );
    }

    #[test]
    fn test_wrap_media_moves_after_block() {
        insta::assert_snapshot!(
            run(
                r#"<p>text<img src="1.png"><img src="2.png"></p><p><iframe src="v"></iframe></p><hr>"#,
                |d, r| {
                    let holders = wrap_media(d, r, HOLDER);
                    assert_eq!(holders.len(), 4);
                }
            ),
            @r#"<p>text</p><div class="folio-media" contenteditable="false"><img src="1.png"></div><div class="folio-media" contenteditable="false"><img src="2.png"></div><div class="folio-media" contenteditable="false"><iframe src="v"></iframe></div><div class="folio-media" contenteditable="false"><hr></div>"#
        );
    }

    #[test]
    fn test_wrap_media_splits_block_around_inline_media() {
        assert_eq!(
            run(r#"<p>text<img src="/x.png">more</p>"#, |d, r| {
                wrap_media(d, r, HOLDER);
            }),
            r#"<p>text</p><div class="folio-media" contenteditable="false"><img src="/x.png"></div><p>more</p>"#
        );
        assert_eq!(
            run(r#"<h2><b>a<img src="1">b</b></h2>"#, |d, r| {
                wrap_media(d, r, HOLDER);
            }),
            r#"<h2><b>a</b></h2><div class="folio-media" contenteditable="false"><img src="1"></div><h2><b>b</b></h2>"#
        );
    }

    #[test]
    fn test_wrap_media_skips_wrapped_and_figure_children() {
        let html = r#"<div class="folio-media" contenteditable="false"><figure><img src="a"></figure></div>"#;
        assert_eq!(
            run(html, |d, r| assert!(wrap_media(d, r, HOLDER).is_empty())),
            html
        );
        assert_eq!(
            run(html, |d, r| unwrap_media_holders(d, r, HOLDER)),
            r#"<figure><img src="a"></figure>"#
        );
    }

    #[test]
    fn test_ensure_minimum_block() {
        assert_eq!(
            run("  ", |d, r| assert!(ensure_minimum_block(d, r))),
            "<p><br></p>"
        );
        assert_eq!(
            run("<p>x</p>", |d, r| assert!(!ensure_minimum_block(d, r))),
            "<p>x</p>"
        );
    }

    #[test]
    fn test_trim_empty_blocks_only_at_ends() {
        assert_eq!(
            run("<p><br></p><p>a</p><p> </p><p>b</p><p></p>", trim_empty_blocks),
            "<p>a</p><p> </p><p>b</p>"
        );
    }

    #[test]
    fn test_delete_contents_merges_blocks() {
        let mut doc = Document::new();
        let root = parse_fragment(&mut doc, "<p>abc</p><h2>mid</h2><p>def</p>");
        let texts = doc.text_nodes(root);
        let range = DomRange::new(Position::new(texts[0], 1), Position::new(texts[2], 2));
        let at = delete_contents(&mut doc, root, range);
        assert_eq!(at, Position::new(texts[0], 1));
        doc.normalize(root);
        assert_eq!(inner_html(&doc, root), "<p>af</p>");
    }

    #[test]
    fn test_insert_nodes_at_splits_text() {
        let mut doc = Document::new();
        let root = parse_fragment(&mut doc, "<p>abcd</p>");
        let t = doc.text_nodes(root)[0];
        let frag = parse_fragment(&mut doc, "<b>X</b>Y");
        let after = insert_nodes_at(&mut doc, Position::new(t, 2), frag);
        assert_eq!(inner_html(&doc, root), "<p>ab<b>X</b>Ycd</p>");
        assert_eq!(doc.text(after.node), Some("Y"));
        assert_eq!(after.offset, 1);
    }
}
