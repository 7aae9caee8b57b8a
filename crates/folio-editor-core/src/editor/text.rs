//! Plain text editor: text with `<br>` line breaks and nothing else.

use crate::config::EditorConfig;
use crate::dom::{Document, DomSelection, NodeId, inner_html};
use crate::error::EditorError;
use crate::filter::{delete_contents, inlinify, insert_nodes_at};
use crate::hooks::{ClientEvent, EditorHooks};
use crate::selection::{self, persist};
use crate::tags::LINE_BREAK_TAG;

use super::{Editor, EditorState};

#[derive(Debug)]
pub struct TextEditor {
    state: EditorState,
}

impl TextEditor {
    pub fn new(
        doc: Document,
        root: Option<NodeId>,
        config: EditorConfig,
        hooks: Box<dyn EditorHooks>,
    ) -> Result<Self, EditorError> {
        let sanitize = config.validate()?;
        let state = EditorState::new(doc, root, config, sanitize, hooks)?;
        let mut editor = Self { state };
        let initial = inner_html(&editor.state.doc, editor.state.root);
        let run_filter = editor.state.config.filter_for_set_data;
        editor.load(&initial, run_filter);
        editor.refresh_interface();
        editor.state.checkpoint_now();
        Ok(editor)
    }

    /// Build an editor over a fresh detached `div` holding `text`.
    pub fn from_text(
        text: &str,
        config: EditorConfig,
        hooks: Box<dyn EditorHooks>,
    ) -> Result<Self, EditorError> {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        let fragment = doc.create_fragment();
        append_lines(&mut doc, fragment, text);
        doc.move_children(fragment, root);
        doc.remove(fragment);
        Self::new(doc, Some(root), config, hooks)
    }

    fn load(&mut self, html: &str, run_filter: bool) {
        let fragment = self.state.prepare_fragment(html, run_filter);
        let state = &mut self.state;
        flatten_to_lines(&mut state.doc, fragment);
        state.doc.remove_children(state.root);
        state.doc.move_children(fragment, state.root);
        state.doc.remove(fragment);
        state.selection = if state.focused {
            Some(state.end_caret())
        } else {
            None
        };
    }

    /// Replace the content with `text`, taken literally.
    pub fn set_text(&mut self, text: &str) {
        if !self.state.alive("set_text") {
            return;
        }
        let state = &mut self.state;
        state.doc.remove_children(state.root);
        append_lines(&mut state.doc, state.root, text);
        state.selection = None;
        self.refresh_interface();
        self.notify_change();
    }

    /// Insert `html` at the selection as plain lines.
    pub fn insert_data(&mut self, html: &str, run_filter: bool) -> bool {
        if !self.state.alive("insert_data") {
            return false;
        }
        let Some(sel) =
            selection::get_selection(&self.state.doc, self.state.root, self.state.selection.as_ref())
        else {
            tracing::warn!("no selection in the editor, data not inserted");
            return false;
        };
        let fragment = self.state.prepare_fragment(html, run_filter);
        let state = &mut self.state;
        flatten_to_lines(&mut state.doc, fragment);
        let range = sel.to_range(&state.doc);
        let at = delete_contents(&mut state.doc, state.root, range);
        let caret = insert_nodes_at(&mut state.doc, at, fragment);
        state.doc.remove(fragment);
        state.selection = Some(DomSelection::collapsed(caret));
        self.merge_text_nodes();
        self.refresh_interface();
        self.notify_change();
        true
    }

    /// Paste `html` at the selection, after the paste hook had its say.
    pub fn paste(&mut self, html: &str) -> bool {
        if !self.state.alive("paste") {
            return false;
        }
        self.state.hooks.on_client_event(&ClientEvent::Paste);
        let html = self.state.hooks.paste_hook(html.to_string());
        self.insert_data(&html, true)
    }

    /// Replace the selection with a line break.
    pub fn insert_line_break(&mut self) -> bool {
        if !self.state.alive("insert_line_break") {
            return false;
        }
        let state = &mut self.state;
        let Some(sel) = selection::get_selection(&state.doc, state.root, state.selection.as_ref())
        else {
            tracing::warn!("no selection in the editor, line break not inserted");
            return false;
        };
        let range = sel.to_range(&state.doc);
        let at = delete_contents(&mut state.doc, state.root, range);
        let fragment = state.doc.create_fragment();
        let br = state.doc.create_element(LINE_BREAK_TAG);
        state.doc.append_child(fragment, br);
        let caret = insert_nodes_at(&mut state.doc, at, fragment);
        state.doc.remove(fragment);
        state.selection = Some(DomSelection::collapsed(caret));
        state.hooks.on_client_event(&ClientEvent::Input);
        self.refresh_interface();
        self.notify_change();
        true
    }

    /// Type `text` at the selection, turning newlines into line breaks.
    pub fn insert_lines(&mut self, text: &str) -> bool {
        let mut inserted = false;
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                inserted |= self.insert_line_break();
            }
            let line = line.strip_suffix('\r').unwrap_or(line);
            if !line.is_empty() {
                inserted |= self.insert_text(line);
            }
        }
        inserted
    }

    fn merge_text_nodes(&mut self) {
        let state = &mut self.state;
        let saved = persist::save(&state.doc, state.root, state.selection.as_ref());
        state.doc.normalize(state.root);
        if saved.is_some() {
            state.selection = persist::restore(&state.doc, saved.as_ref());
        }
    }
}

/// Append `text` under `parent`, one text node per line with `<br>`
/// between lines.
fn append_lines(doc: &mut Document, parent: NodeId, text: &str) {
    let text = text.replace("\r\n", "\n");
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            let br = doc.create_element(LINE_BREAK_TAG);
            doc.append_child(parent, br);
        }
        if !line.is_empty() {
            let node = doc.create_text(line);
            doc.append_child(parent, node);
        }
    }
}

/// Reduce everything under `root` to text and line breaks. Former blocks
/// end in a break; the last break is dropped.
fn flatten_to_lines(doc: &mut Document, root: NodeId) {
    inlinify(doc, root, true);
    for node in doc.descendants(root) {
        if !doc.is_live(node) || doc.is_text(node) || doc.has_tag(node, &[LINE_BREAK_TAG]) {
            continue;
        }
        if doc.is_element(node) {
            doc.unwrap(node);
        } else {
            doc.remove(node);
        }
    }
    for text in doc.text_nodes(root) {
        let Some(content) = doc.text(text).map(str::to_string) else {
            continue;
        };
        if !content.contains('\n') {
            continue;
        }
        let fragment = doc.create_fragment();
        append_lines(doc, fragment, &content);
        for child in doc.children(fragment).to_vec() {
            doc.insert_before(text, child);
        }
        doc.remove(text);
        doc.remove(fragment);
    }
    if let Some(last) = doc.last_child(root) {
        if doc.has_tag(last, &[LINE_BREAK_TAG]) {
            doc.remove(last);
        }
    }
    doc.normalize(root);
}

impl Editor for TextEditor {
    fn state(&self) -> &EditorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut EditorState {
        &mut self.state
    }

    fn get_data(&self, trim: bool, _keep_media_tracking_attrs: bool) -> String {
        let state = &self.state;
        let mut out = String::new();
        for &child in state.doc.children(state.root) {
            if let Some(text) = state.doc.text(child) {
                out.push_str(text);
            } else if state.doc.has_tag(child, &[LINE_BREAK_TAG]) {
                out.push('\n');
            }
        }
        if trim {
            out.trim().to_string()
        } else {
            out
        }
    }

    fn set_data(&mut self, data: &str, run_filter: bool, _run_block_normalization: bool) {
        if !self.state.alive("set_data") {
            return;
        }
        self.load(data, run_filter);
        self.refresh_interface();
        self.notify_change();
    }

    fn normalize_after_input(&mut self) {
        if !self.state.alive("normalize_after_input") {
            return;
        }
        let state = &mut self.state;
        let before = inner_html(&state.doc, state.root);
        let saved = persist::save(&state.doc, state.root, state.selection.as_ref());
        flatten_to_lines(&mut state.doc, state.root);
        if inner_html(&state.doc, state.root) != before {
            if saved.is_some() {
                state.selection = persist::restore(&state.doc, saved.as_ref());
            }
            self.refresh_interface();
            self.notify_change();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Position;
    use crate::hooks::NoHooks;

    fn editor(text: &str) -> TextEditor {
        TextEditor::from_text(text, EditorConfig::default(), Box::new(NoHooks)).unwrap()
    }

    #[test]
    fn test_lines_round_trip() {
        let editor = editor("line one\nline two");
        assert_eq!(editor.get_html(), "line one<br>line two");
        assert_eq!(editor.get_data(false, false), "line one\nline two");
    }

    #[test]
    fn test_set_data_flattens_markup() {
        let mut editor = editor("");
        editor.set_data("<p>a <b>bold</b></p><p>b<script>x()</script></p>", true, true);
        assert_eq!(editor.get_html(), "a bold<br>b");
        editor.set_data("\n  padded \n", true, true);
        assert_eq!(editor.get_data(true, false), "padded");
    }

    #[test]
    fn test_insert_lines_at_caret() {
        let mut editor = editor("ab");
        let Some(text) = editor.state().doc().first_child(editor.state().root()) else {
            panic!("text");
        };
        editor.set_selection(Some(DomSelection::collapsed(Position::new(text, 1))));
        assert!(editor.insert_lines("x\ny"));
        assert_eq!(editor.get_data(false, false), "ax\nyb");
    }

    #[test]
    fn test_insert_data_keeps_text_only() {
        let mut editor = editor("ab");
        editor.focus(false);
        assert!(editor.insert_data("<h1>Title</h1><img src=\"a.png\">", true));
        assert_eq!(editor.get_data(false, false), "abTitle");
    }
}
