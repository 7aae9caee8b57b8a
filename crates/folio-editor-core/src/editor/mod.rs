//! Editor state and the operations shared by both editors.
//!
//! Defines the `Editor` trait: implementors expose their [`EditorState`] and
//! the few behaviors that differ between rich and plain text editing; every
//! other operation is provided.

pub mod rich;
pub mod text;

use std::time::Duration;

use web_time::Instant;

use crate::config::EditorConfig;
use crate::dom::{
    CONTENTEDITABLE_ATTR, Document, DomSelection, NodeId, Position, inner_html, parse_fragment,
};
use crate::error::EditorError;
use crate::filter::{delete_contents, is_empty_element};
use crate::hooks::{ClientEvent, EditorHooks};
use crate::media::MediaTracker;
use crate::sanitize::{SanitizeConfig, Sanitizer, TagAliases, neutralize_iframes};
use crate::selection::{self, editable_text_nodes, persist};
use crate::smart_quotes::apply_smart_quotes;
use crate::timers::{REFRESH_DELAY, TaskKind, Timers, UNDO_DEBOUNCE};
use crate::tags::LINE_BREAK_TAG;
use crate::undo::{ChangeAction, UndoHistory, UndoManager, UndoState, UndoTarget};

pub use rich::RichEditor;
pub use text::TextEditor;

/// Attribute set on the root while the placeholder shows.
pub const PLACEHOLDER_ATTR: &str = "data-placeholder";

/// State shared by the rich and plain text editors.
pub struct EditorState {
    pub(crate) doc: Document,
    pub(crate) root: NodeId,
    pub(crate) selection: Option<DomSelection>,
    pub(crate) config: EditorConfig,
    pub(crate) sanitizer: Sanitizer,
    pub(crate) hooks: Box<dyn EditorHooks>,
    pub(crate) undo: UndoHistory,
    pub(crate) timers: Timers,
    pub(crate) tracker: MediaTracker,
    focused: bool,
    torn_down: bool,
    revision: u64,
}

impl std::fmt::Debug for EditorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorState")
            .field("root", &self.root)
            .field("selection", &self.selection)
            .field("focused", &self.focused)
            .field("torn_down", &self.torn_down)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

impl EditorState {
    /// Fails when `root` is absent or not an element of `doc`.
    pub fn new(
        mut doc: Document,
        root: Option<NodeId>,
        config: EditorConfig,
        sanitize: SanitizeConfig,
        hooks: Box<dyn EditorHooks>,
    ) -> Result<Self, EditorError> {
        let root = root
            .filter(|&r| doc.is_element(r))
            .ok_or(EditorError::MissingRoot)?;
        doc.set_attr(root, CONTENTEDITABLE_ATTR, "true");
        Ok(Self {
            doc,
            root,
            selection: None,
            sanitizer: Sanitizer::new(sanitize).with_transformer(TagAliases::default()),
            undo: UndoHistory::new(config.undo_depth),
            config,
            hooks,
            timers: Timers::new(),
            tracker: MediaTracker::new(),
            focused: false,
            torn_down: false,
            revision: 0,
        })
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    /// Direct access to the model, for hosts mirroring a live DOM. Changes
    /// made here are not noticed until the host reports them.
    pub fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn selection(&self) -> Option<DomSelection> {
        self.selection
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn tracker(&self) -> &MediaTracker {
        &self.tracker
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    /// Bumped on every model change; hosts re-render when it moves.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Logs and returns `false` once the editor is torn down.
    pub(crate) fn alive(&self, operation: &str) -> bool {
        if self.torn_down {
            tracing::warn!(operation, "editor has been torn down");
        }
        !self.torn_down
    }

    pub(crate) fn touch(&mut self) {
        self.revision += 1;
    }

    /// Run `f` with the undo history and a snapshot view of the document.
    fn with_history<R>(&mut self, f: impl FnOnce(&mut UndoHistory, &mut Snapshot<'_>) -> R) -> R {
        let mut target = Snapshot {
            doc: &mut self.doc,
            root: self.root,
            selection: &mut self.selection,
            tracker: &self.tracker,
            key_attr: &self.config.img_key_attr,
        };
        f(&mut self.undo, &mut target)
    }

    /// Record the current document as the undo baseline.
    pub(crate) fn checkpoint_now(&mut self) {
        self.with_history(|history, target| history.capture(&*target));
    }

    /// Take a change that must not become an undo step into the baseline.
    /// When a capture is already pending the change rides along with it.
    pub(crate) fn rebase_checkpoint(&mut self) {
        if self.timers.is_pending(TaskKind::UndoCheckpoint) {
            return;
        }
        self.with_history(|history, target| history.rebase(&*target));
    }

    pub(crate) fn changed(&mut self) {
        self.touch();
        let now = Instant::now();
        let action = self.with_history(|history, target| history.on_change(&*target));
        if action == ChangeAction::Debounce {
            self.timers.debounce(TaskKind::UndoCheckpoint, UNDO_DEBOUNCE, now);
        }
        self.hooks.on_change();
    }

    /// Parse `html` into a detached fragment, filtered when asked. Iframe
    /// sources are parked when the config says so.
    pub(crate) fn prepare_fragment(&mut self, html: &str, run_filter: bool) -> NodeId {
        let parsed = parse_fragment(&mut self.doc, html);
        let fragment = if run_filter {
            let clean = self.sanitizer.clean(&mut self.doc, parsed);
            self.doc.remove(parsed);
            clean
        } else {
            parsed
        };
        if self.config.run_iframe_sanitization {
            neutralize_iframes(&mut self.doc, fragment);
        }
        fragment
    }

    /// Replace the root's children with `html`, unfiltered.
    pub(crate) fn replace_content(&mut self, html: &str) {
        replace_children(&mut self.doc, self.root, html);
    }

    /// Show or hide the placeholder. Returns whether it shows.
    pub(crate) fn update_placeholder(&mut self) -> bool {
        let show = self.config.placeholder.as_deref().filter(|_| {
            is_empty_element(&self.doc, self.root, true)
        });
        match show {
            Some(text) => {
                let text = text.to_string();
                self.doc.set_attr(self.root, PLACEHOLDER_ATTR, &text);
                true
            }
            None => {
                self.doc.remove_attr(self.root, PLACEHOLDER_ATTR);
                false
            }
        }
    }

    /// Caret at the end of the last editable block, or of the root when it
    /// holds loose content.
    pub(crate) fn end_caret(&self) -> DomSelection {
        let el = self
            .doc
            .last_child(self.root)
            .filter(|&c| self.doc.is_element(c) && !self.doc.is_non_editable(c))
            .unwrap_or(self.root);
        persist::set_to_end(&self.doc, el)
    }

    /// Running editable-text offset of `at`.
    fn text_offset(&self, at: Position) -> usize {
        persist::save(&self.doc, self.root, Some(&DomSelection::collapsed(at)))
            .map(|s| s.start)
            .unwrap_or(0)
    }

    fn text_len(&self) -> usize {
        editable_text_nodes(&self.doc, self.root)
            .into_iter()
            .map(|t| self.doc.node_len(t))
            .sum()
    }

    fn char_before(&self, offset: usize) -> Option<char> {
        let text: String = editable_text_nodes(&self.doc, self.root)
            .into_iter()
            .filter_map(|t| self.doc.text(t))
            .collect();
        offset.checked_sub(1).and_then(|i| text.chars().nth(i))
    }
}

/// Undo's view of an editor: serialized content plus selection.
struct Snapshot<'a> {
    doc: &'a mut Document,
    root: NodeId,
    selection: &'a mut Option<DomSelection>,
    tracker: &'a MediaTracker,
    key_attr: &'a str,
}

impl UndoTarget for Snapshot<'_> {
    fn snapshot(&self) -> UndoState {
        UndoState {
            html: inner_html(self.doc, self.root),
            selection: persist::save(self.doc, self.root, self.selection.as_ref()),
        }
    }

    fn restore(&mut self, state: &UndoState) {
        replace_children(self.doc, self.root, &state.html);
        *self.selection = persist::restore(self.doc, state.selection.as_ref());
    }

    fn after_restore(&mut self) {
        self.tracker.reconcile(self.doc, self.root, self.key_attr);
    }
}

fn replace_children(doc: &mut Document, root: NodeId, html: &str) {
    doc.remove_children(root);
    let fragment = parse_fragment(doc, html);
    doc.move_children(fragment, root);
    doc.remove(fragment);
}

/// Splice `text` into the document at `at`. Returns the caret after it.
pub(crate) fn insert_plain_text(doc: &mut Document, at: Position, text: &str) -> Position {
    let inserted = text.chars().count();
    if let Some(existing) = doc.text(at.node) {
        let mut content = existing.to_string();
        content.insert_str(crate::dom::char_to_byte(&content, at.offset), text);
        doc.set_text(at.node, content);
        return Position::new(at.node, at.offset + inserted);
    }

    let before = at
        .offset
        .checked_sub(1)
        .and_then(|i| doc.children(at.node).get(i).copied());
    if let Some(prev) = before.filter(|&p| doc.is_text(p)) {
        let len = doc.node_len(prev);
        return insert_plain_text(doc, Position::new(prev, len), text);
    }

    // An empty block holds a lone `<br>` until it gets text.
    let children = doc.children(at.node).to_vec();
    if let [only] = children.as_slice() {
        if doc.has_tag(*only, &[LINE_BREAK_TAG]) {
            doc.remove(*only);
        }
    }
    let node = doc.create_text(text);
    doc.insert_child(at.node, at.offset, node);
    Position::new(node, inserted)
}

/// Operations shared by the rich and plain text editors.
pub trait Editor {
    // === Required: State access ===

    fn state(&self) -> &EditorState;

    fn state_mut(&mut self) -> &mut EditorState;

    // === Required: Mode-specific content handling ===

    /// Serialized content. `keep_media_tracking_attrs` is ignored by
    /// editors without media.
    fn get_data(&self, trim: bool, keep_media_tracking_attrs: bool) -> String;

    fn set_data(&mut self, data: &str, run_filter: bool, run_block_normalization: bool);

    /// Restore structural invariants after native input landed.
    fn normalize_after_input(&mut self);

    // === Provided: Interface state ===

    /// Recompute interface state. Must be idempotent.
    fn refresh_interface(&mut self) {
        self.state_mut().update_placeholder();
    }

    /// Close floating controls.
    fn close_controls(&mut self) {}

    fn notify_change(&mut self) {
        self.state_mut().changed();
    }

    // === Provided: Focus ===

    fn focus(&mut self, skip_cursor_move: bool) {
        if !self.state().alive("focus") {
            return;
        }
        let state = self.state_mut();
        state.focused = true;
        let inside = selection::get_selection(&state.doc, state.root, state.selection.as_ref());
        if !skip_cursor_move && inside.is_none() {
            state.selection = Some(state.end_caret());
        }
        state.hooks.on_client_event(&ClientEvent::Focus);
        state
            .timers
            .schedule(TaskKind::InterfaceRefresh, REFRESH_DELAY, Instant::now());
    }

    /// Returns `false` when the blur hook kept the editor focused.
    fn blur(&mut self, skip_control_close: bool) -> bool {
        if !self.state().alive("blur") {
            return false;
        }
        if !self.state_mut().hooks.blur_hook() {
            return false;
        }
        if !skip_control_close {
            self.close_controls();
        }
        let state = self.state_mut();
        state.focused = false;
        state.hooks.on_client_event(&ClientEvent::Blur);
        true
    }

    fn has_focus(&self) -> bool {
        self.state().focused
    }

    // === Provided: Queries ===

    /// `None` hides the placeholder for good.
    fn set_placeholder(&mut self, value: Option<&str>) {
        let state = self.state_mut();
        state.config.placeholder = value.map(str::to_string);
        state.update_placeholder();
    }

    fn placeholder_visible(&self) -> bool {
        self.state().doc.has_attr(self.state().root, PLACEHOLDER_ATTR)
    }

    fn is_empty(&self) -> bool {
        let state = self.state();
        is_empty_element(&state.doc, state.root, true)
    }

    fn is_empty_element(&self, el: Option<NodeId>) -> bool {
        let state = self.state();
        is_empty_element(&state.doc, el.unwrap_or(state.root), true)
    }

    fn has_selection(&self, el: Option<NodeId>) -> bool {
        let state = self.state();
        selection::has_selection(&state.doc, el.unwrap_or(state.root), state.selection.as_ref())
    }

    /// Root block holding the selection start.
    fn get_current_element(&self) -> Option<NodeId> {
        let state = self.state();
        selection::get_root_elements(&state.doc, state.root, state.selection.as_ref())
            .first()
            .copied()
    }

    fn is_cursor_at_start(&self, el: Option<NodeId>) -> bool {
        let state = self.state();
        let el = el.or_else(|| self.get_current_element()).unwrap_or(state.root);
        selection::is_cursor_at_start(&state.doc, el, state.selection.as_ref(), true)
    }

    fn is_cursor_at_end(&self, el: Option<NodeId>) -> bool {
        let state = self.state();
        let el = el.or_else(|| self.get_current_element()).unwrap_or(state.root);
        selection::is_cursor_at_end(&state.doc, el, state.selection.as_ref(), true)
    }

    // === Provided: Selection ===

    /// Take a selection reported by the host.
    fn set_selection(&mut self, selection: Option<DomSelection>) {
        let state = self.state_mut();
        if state.selection == selection {
            return;
        }
        state.selection = selection;
        let has = selection::has_selection(&state.doc, state.root, state.selection.as_ref());
        state.hooks.on_selection(has);
        state
            .timers
            .schedule(TaskKind::InterfaceRefresh, REFRESH_DELAY, Instant::now());
    }

    fn set_cursor_to_start(&mut self, el: Option<NodeId>) {
        let state = self.state_mut();
        let el = el.unwrap_or(state.root);
        let caret = persist::set_to_start(&state.doc, el);
        self.set_selection(Some(caret));
    }

    fn set_cursor_to_end(&mut self, el: Option<NodeId>) {
        let state = self.state_mut();
        let el = el.unwrap_or(state.root);
        let caret = persist::set_to_end(&state.doc, el);
        self.set_selection(Some(caret));
    }

    // === Provided: Raw content ===

    /// Replace the content without filtering or normalization.
    fn set_html(&mut self, html: &str) {
        if !self.state().alive("set_html") {
            return;
        }
        let state = self.state_mut();
        state.replace_content(html);
        state.selection = None;
        self.refresh_interface();
        self.notify_change();
    }

    /// The content as is, without filtering.
    fn get_html(&self) -> String {
        let state = self.state();
        inner_html(&state.doc, state.root)
    }

    // === Provided: Editing ===

    /// Type `text` over the selection, applying smart quotes and the
    /// character limit. Returns `false` when nothing was inserted.
    fn insert_text(&mut self, text: &str) -> bool {
        if !self.state().alive("insert_text") {
            return false;
        }
        let state = self.state_mut();
        let Some(selection) =
            selection::get_selection(&state.doc, state.root, state.selection.as_ref())
        else {
            tracing::warn!("no selection in the editor, text not inserted");
            return false;
        };
        let range = selection.to_range(&state.doc);

        let mut text = text.to_string();
        if let Some(limit) = state.config.character_limit {
            let selected = range.to_string(&state.doc).chars().count();
            let remaining = limit.saturating_sub(state.text_len().saturating_sub(selected));
            text = text.chars().take(remaining).collect();
        }
        if text.is_empty() {
            return false;
        }

        let at = delete_contents(&mut state.doc, state.root, range);
        if state.config.smart_quotes.enabled {
            let prev = state.char_before(state.text_offset(at));
            text = apply_smart_quotes(&text, prev, &state.config.smart_quotes.config);
        }
        let caret = insert_plain_text(&mut state.doc, at, &text);
        state.selection = Some(DomSelection::collapsed(caret));
        state.hooks.on_client_event(&ClientEvent::Input);
        self.refresh_interface();
        self.notify_change();
        true
    }

    /// Native input changed the document; the host has already mirrored it
    /// into the model.
    fn input_received(&mut self) {
        if !self.state().alive("input_received") {
            return;
        }
        let state = self.state_mut();
        state
            .timers
            .schedule(TaskKind::AfterInput, Duration::ZERO, Instant::now());
        state.hooks.on_client_event(&ClientEvent::Input);
        self.notify_change();
    }

    // === Provided: Deferred work ===

    /// Run every task due at `now`. Returns how many ran.
    fn poll(&mut self, now: Instant) -> usize {
        if self.state().torn_down {
            return 0;
        }
        let due = self.state_mut().timers.poll(now);
        for task in &due {
            match task {
                TaskKind::UndoCheckpoint => self.state_mut().checkpoint_now(),
                TaskKind::InterfaceRefresh => self.refresh_interface(),
                TaskKind::AfterInput => self.normalize_after_input(),
            }
        }
        due.len()
    }

    /// Run every pending task now.
    fn flush(&mut self) -> usize {
        match self.state().timers.next_due() {
            Some(_) => self.poll(Instant::now() + Duration::from_secs(3600)),
            None => 0,
        }
    }

    // === Provided: Teardown ===

    /// Cancel pending work and drop side state. Later mutations are no-ops.
    fn teardown(&mut self) {
        if self.state().torn_down {
            return;
        }
        self.close_controls();
        let state = self.state_mut();
        state.timers.cancel_all();
        state.tracker.clear();
        state.doc.remove_attr(state.root, PLACEHOLDER_ATTR);
        state.focused = false;
        state.torn_down = true;
        tracing::debug!("editor torn down");
    }
}

impl<E: Editor> UndoManager for E {
    fn can_undo(&self) -> bool {
        self.state().undo.can_undo()
    }

    fn can_redo(&self) -> bool {
        self.state().undo.can_redo()
    }

    fn undo(&mut self) -> bool {
        if !self.state().alive("undo") {
            return false;
        }
        let done = self.state_mut().with_history(|history, target| history.undo(target));
        if done {
            self.refresh_interface();
            self.notify_change();
        }
        done
    }

    fn redo(&mut self) -> bool {
        if !self.state().alive("redo") {
            return false;
        }
        let done = self.state_mut().with_history(|history, target| history.redo(target));
        if done {
            self.refresh_interface();
            self.notify_change();
        }
        done
    }

    fn clear_history(&mut self) {
        self.state_mut().undo.clear_history();
    }
}
