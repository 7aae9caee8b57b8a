//! The block-model rich text editor.

use smol_str::SmolStr;

use crate::commands::{
    CommandOutcome, CommandRouter, EditContext, FormatCommand, FormattingPrimitives, LinkEditor,
    ModelPrimitives,
};
use crate::config::EditorConfig;
use crate::dom::{Document, DomSelection, NodeId, inner_html};
use crate::error::{EditorError, MediaError};
use crate::filter::{
    blockify, create_media_holder, delete_contents, ensure_minimum_block, flatten_blocks_down,
    inlinify, insert_nodes_at, is_empty_element, is_media_holder, scrub_spans_and_bad_attrs,
    trim_empty_blocks, unwrap_media_holders, wrap_media,
};
use crate::hooks::{ClientEvent, EditorHooks};
use crate::media::{
    Direction, FileRef, ImageDimensions, ImageLoad, ImageSource, ResolvedImage,
    find_tracked_image, strip_tracking_attrs,
};
use crate::sanitize::restore_iframes;
use crate::selection::{self, persist, root_block_of};
use crate::tags::{
    LINE_BREAK_TAG, PARAGRAPH_TAG, SEPARATOR_TAG, TEXT_BLOCK_TAGS, is_block, is_media,
};
use crate::undo::UndoManager;

use super::{Editor, EditorState, replace_children};

/// Rich text editor over a flat run of blocks.
///
/// Formatting goes through a [`CommandRouter`], so hosts can swap the
/// primitive surface (`P`) while keeping the normalization around it.
#[derive(Debug)]
pub struct RichEditor<P = ModelPrimitives> {
    state: EditorState,
    router: CommandRouter<P>,
    link_editor: LinkEditor,
    active: Vec<FormatCommand>,
}

impl RichEditor<ModelPrimitives> {
    /// Attach to `root` in `doc`. Existing content is filtered and
    /// normalized, and becomes the first undo checkpoint.
    pub fn new(
        doc: Document,
        root: Option<NodeId>,
        config: EditorConfig,
        hooks: Box<dyn EditorHooks>,
    ) -> Result<Self, EditorError> {
        Self::with_primitives(doc, root, config, hooks, ModelPrimitives)
    }

    /// Build an editor over a fresh detached `div` holding `html`.
    pub fn from_html(
        html: &str,
        config: EditorConfig,
        hooks: Box<dyn EditorHooks>,
    ) -> Result<Self, EditorError> {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        replace_children(&mut doc, root, html);
        Self::new(doc, Some(root), config, hooks)
    }
}

impl<P: FormattingPrimitives> RichEditor<P> {
    pub fn with_primitives(
        doc: Document,
        root: Option<NodeId>,
        config: EditorConfig,
        hooks: Box<dyn EditorHooks>,
        primitives: P,
    ) -> Result<Self, EditorError> {
        let sanitize = config.validate()?;
        let link_editor = LinkEditor::new(config.link.bypass_classes.iter().cloned());
        let state = EditorState::new(doc, root, config, sanitize, hooks)?;
        let mut editor = Self {
            state,
            router: CommandRouter::new(primitives),
            link_editor,
            active: Vec::new(),
        };
        let initial = inner_html(&editor.state.doc, editor.state.root);
        let run_filter = editor.state.config.filter_for_set_data;
        editor.load(&initial, run_filter, true);
        editor.refresh_interface();
        editor.state.checkpoint_now();
        tracing::debug!(target: "folio::editor", root = %editor.state.root, "rich editor ready");
        Ok(editor)
    }

    pub fn router(&self) -> &CommandRouter<P> {
        &self.router
    }

    pub fn link_editor(&self) -> &LinkEditor {
        &self.link_editor
    }

    /// Toolbar state from the last interface refresh.
    pub fn active_commands(&self) -> &[FormatCommand] {
        &self.active
    }

    // === Content ===

    /// Replace the content. No notification; callers decide.
    fn load(&mut self, html: &str, run_filter: bool, run_block_normalization: bool) {
        let fragment = self.state.prepare_fragment(html, run_filter);
        let state = &mut self.state;
        let (doc, root) = (&mut state.doc, state.root);
        doc.remove_children(root);
        doc.move_children(fragment, root);
        doc.remove(fragment);
        if run_block_normalization {
            if state.config.flatten_blocks {
                flatten_blocks_down(doc, root, false);
            } else {
                blockify(doc, root);
            }
        }
        self.enforce_media_boundaries();
        let state = &mut self.state;
        ensure_minimum_block(&mut state.doc, state.root);
        state.tracker.prune(&state.doc, state.root, &state.config.img_key_attr);
        state.selection = if state.focused {
            Some(state.end_caret())
        } else {
            None
        };
    }

    /// Wrap stray media in holders and report each new holder.
    fn enforce_media_boundaries(&mut self) -> bool {
        let state = &mut self.state;
        let holders = wrap_media(&mut state.doc, state.root, &state.config.media_holder_class);
        for &holder in &holders {
            state.hooks.on_media_holder(&state.doc, holder);
        }
        !holders.is_empty()
    }

    /// Insert `html` at the selection, replacing selected content.
    ///
    /// Block content pasted into an empty block replaces that block; pasted
    /// anywhere else it is flattened into lines. Returns `false` when there
    /// is no selection.
    pub fn insert_data(&mut self, html: &str, run_filter: bool, run_block_normalization: bool) -> bool {
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
        let (doc, root) = (&mut state.doc, state.root);

        let range = sel.to_range(doc);
        let at = delete_contents(doc, root, range);
        let block = root_block_of(doc, root, at.node)
            .filter(|&b| !doc.is_non_editable(b) && is_empty_element(doc, b, true));
        let has_blocks = doc.children(fragment).iter().any(|&c| {
            doc.tag(c)
                .is_some_and(|t| is_block(t) || is_media(t) || t == SEPARATOR_TAG)
        });

        let caret = match block {
            Some(empty) if run_block_normalization && has_blocks => {
                flatten_blocks_down(doc, fragment, false);
                let last = doc.last_child(fragment);
                for child in doc.children(fragment).to_vec() {
                    doc.insert_before(empty, child);
                }
                doc.remove(empty);
                last.map(|l| persist::set_to_end(doc, l).anchor)
            }
            _ => {
                if run_block_normalization {
                    inlinify(doc, fragment, true);
                    if let Some(last) = doc.last_child(fragment) {
                        if doc.has_tag(last, &[LINE_BREAK_TAG]) {
                            doc.remove(last);
                        }
                    }
                }
                Some(insert_nodes_at(doc, at, fragment))
            }
        };
        doc.remove(fragment);

        if run_block_normalization {
            blockify(doc, root);
        }
        let blocks = doc.children(root).to_vec();
        scrub_spans_and_bad_attrs(doc, &blocks);
        state.selection = caret.map(DomSelection::collapsed);
        self.enforce_media_boundaries();
        let state = &mut self.state;
        ensure_minimum_block(&mut state.doc, state.root);
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
        self.insert_data(&html, true, true)
    }

    // === Media ===

    /// Insert `html` as one media block. With no `target` the block holding
    /// the selection is used; with no `direction` it is picked from the
    /// caret. Returns the new holder.
    pub fn insert_media(
        &mut self,
        html: &str,
        run_filter: bool,
        target: Option<NodeId>,
        direction: Option<Direction>,
    ) -> Option<NodeId> {
        if !self.state.alive("insert_media") {
            return None;
        }
        let fragment = self.state.prepare_fragment(html, run_filter);
        let state = &mut self.state;
        if !state.doc.children(fragment).iter().any(|&c| state.doc.is_element(c)) {
            state.doc.remove(fragment);
            tracing::warn!(target: "folio::media", "media markup had no elements");
            return None;
        }
        let holder = create_media_holder(&mut state.doc, &state.config.media_holder_class);
        state.doc.move_children(fragment, holder);
        state.doc.remove(fragment);

        self.place_block(holder, target, direction);
        self.state.hooks.on_media_holder(&self.state.doc, holder);
        self.move_caret_past(holder);
        self.refresh_interface();
        self.notify_change();
        Some(holder)
    }

    fn place_block(&mut self, node: NodeId, target: Option<NodeId>, direction: Option<Direction>) {
        let current = self.get_current_element();
        let state = &mut self.state;
        let (doc, root) = (&mut state.doc, state.root);
        let target = target
            .filter(|&t| doc.is_live(t) && (t == root || doc.contains(root, t)))
            .map(|t| {
                if t == root {
                    t
                } else {
                    root_block_of(doc, root, t).unwrap_or(t)
                }
            })
            .or(current);
        let Some(target) = target else {
            doc.append_child(root, node);
            return;
        };

        let empty_block =
            target != root && !doc.is_non_editable(target) && is_empty_element(doc, target, true);
        let direction = direction.unwrap_or_else(|| {
            if target == root || empty_block {
                Direction::Inside
            } else if selection::is_cursor_at_start(doc, target, state.selection.as_ref(), true) {
                Direction::Before
            } else {
                Direction::After
            }
        });
        match direction {
            Direction::Before if target == root => doc.prepend_child(root, node),
            Direction::Before => doc.insert_before(target, node),
            Direction::After | Direction::Inside if target == root => doc.append_child(root, node),
            Direction::Inside if empty_block => {
                doc.insert_before(target, node);
                doc.remove(target);
            }
            Direction::After | Direction::Inside => doc.insert_after(target, node),
        }
    }

    /// Put the caret in the text block after `holder`, creating one if the
    /// holder ends the document or is followed by another non-text block.
    fn move_caret_past(&mut self, holder: NodeId) {
        let doc = &mut self.state.doc;
        let next = doc
            .next_sibling(holder)
            .filter(|&n| !doc.is_non_editable(n) && doc.has_tag(n, TEXT_BLOCK_TAGS));
        let next = match next {
            Some(next) => next,
            None => {
                let p = doc.create_element(PARAGRAPH_TAG);
                let br = doc.create_element(LINE_BREAK_TAG);
                doc.append_child(p, br);
                doc.insert_after(holder, p);
                p
            }
        };
        self.state.selection = Some(persist::set_to_start(doc, next));
    }

    fn report_media_error(&mut self, err: &MediaError) {
        tracing::warn!(target: "folio::media", %err, "media insertion failed");
        self.state.hooks.on_async_image_failed(err);
    }

    /// Insert an image whose final source may arrive later. The returned
    /// key identifies it in [`finish_async_image`](Self::finish_async_image)
    /// and [`update_async_image`](Self::update_async_image).
    pub fn insert_async_image(
        &mut self,
        source: ImageSource,
        target: Option<NodeId>,
        direction: Option<Direction>,
        skip_selection_update: bool,
    ) -> Result<SmolStr, MediaError> {
        if !self.state.alive("insert_async_image") {
            return Err(MediaError::TornDown);
        }
        let src = match source.resolve() {
            Ok(src) => src,
            Err(err) => {
                self.report_media_error(&err);
                return Err(err);
            }
        };
        let state = &mut self.state;
        let key = state.tracker.track(&source, src.clone());
        let img = state.doc.create_element("img");
        state.doc.set_attr(img, "src", &src);
        state.doc.set_attr(img, &state.config.img_key_attr, &key);
        for (name, value) in &state.config.add_img_attrs {
            state.doc.set_attr(img, name, value);
        }
        let holder = create_media_holder(&mut state.doc, &state.config.media_holder_class);
        state.doc.append_child(holder, img);

        self.place_block(holder, target, direction);
        self.state.hooks.on_media_holder(&self.state.doc, holder);
        if !skip_selection_update {
            self.move_caret_past(holder);
        }
        self.refresh_interface();
        self.notify_change();
        tracing::debug!(target: "folio::media", %key, "async image inserted");

        if let Some(dimensions) = source.dimensions {
            self.complete_image(&key, dimensions)?;
        }
        Ok(key)
    }

    /// Record how loading the image under `key` went.
    pub fn finish_async_image(&mut self, key: &str, load: ImageLoad) -> Result<(), MediaError> {
        if !self.state.alive("finish_async_image") {
            return Err(MediaError::TornDown);
        }
        match load {
            ImageLoad::Loaded(dimensions) => self.complete_image(key, dimensions),
            ImageLoad::Failed(reason) => {
                let err = MediaError::LoadFailed(reason);
                self.report_media_error(&err);
                Err(err)
            }
        }
    }

    fn complete_image(&mut self, key: &str, dimensions: ImageDimensions) -> Result<(), MediaError> {
        let state = &mut self.state;
        let img = find_tracked_image(&state.doc, state.root, &state.config.img_key_attr, key)
            .ok_or_else(|| MediaError::UnknownKey(SmolStr::new(key)))?;
        let (width, height) = &state.config.img_size_attrs;
        state.doc.set_attr(img, width, &dimensions.width.to_string());
        state.doc.set_attr(img, height, &dimensions.height.to_string());
        state.touch();
        state.rebase_checkpoint();
        if state.tracker.mark_loaded(key)? {
            let src = state
                .tracker
                .get(key)
                .map(|t| t.current_source().to_string())
                .unwrap_or_default();
            state.hooks.on_async_image_added(&ResolvedImage {
                key: SmolStr::new(key),
                src,
                dimensions: Some(dimensions),
            });
        }
        Ok(())
    }

    /// Change the source or attributes of a tracked image in place. The
    /// change is not an undo step; undo keeps the newest source.
    pub fn update_async_image(
        &mut self,
        key: &str,
        src: Option<&str>,
        attributes: &[(&str, &str)],
    ) -> Result<(), MediaError> {
        if !self.state.alive("update_async_image") {
            return Err(MediaError::TornDown);
        }
        let state = &mut self.state;
        let img = find_tracked_image(&state.doc, state.root, &state.config.img_key_attr, key)
            .ok_or_else(|| MediaError::UnknownKey(SmolStr::new(key)))?;
        if let Some(src) = src {
            state.tracker.set_updated_source(key, src)?;
            state.doc.set_attr(img, "src", src);
        }
        for (name, value) in attributes {
            state.doc.set_attr(img, name, value);
        }
        state.touch();
        state.rebase_checkpoint();
        Ok(())
    }

    /// Insert each image file as an async image at the selection. Files
    /// that are not images are reported and skipped.
    pub fn insert_files(&mut self, files: impl IntoIterator<Item = FileRef>) -> Vec<SmolStr> {
        let mut keys = Vec::new();
        for file in files {
            if !self.state.alive("insert_files") {
                break;
            }
            self.state.hooks.on_file_added(&file);
            if let Ok(key) = self.insert_async_image(ImageSource::file(file), None, None, false) {
                keys.push(key);
            }
        }
        keys
    }

    /// Remove a media holder and the media in it.
    pub fn remove_media_holder(&mut self, holder: NodeId) -> bool {
        if !self.state.alive("remove_media_holder") {
            return false;
        }
        let state = &mut self.state;
        let (doc, root) = (&mut state.doc, state.root);
        if !doc.is_live(holder)
            || !doc.contains(root, holder)
            || !is_media_holder(doc, holder, &state.config.media_holder_class)
        {
            return false;
        }
        let neighbor = doc.next_sibling(holder).or_else(|| doc.prev_sibling(holder));
        doc.remove(holder);
        ensure_minimum_block(doc, root);
        state.tracker.prune(doc, root, &state.config.img_key_attr);
        let caret = neighbor
            .filter(|&n| !doc.is_non_editable(n))
            .or_else(|| doc.first_child(root))
            .map(|n| persist::set_to_start(doc, n));
        state.selection = caret;
        self.refresh_interface();
        self.notify_change();
        true
    }

    // === Commands ===

    /// Apply a command by name, as a toolbar would.
    pub fn apply_command(&mut self, name: &str, element: Option<&str>) -> Option<CommandOutcome> {
        self.apply(&FormatCommand::parse(name, element))
    }

    pub fn apply(&mut self, command: &FormatCommand) -> Option<CommandOutcome> {
        self.run_command("apply", |router, cx| router.apply(cx, command))
    }

    pub fn inverse(&mut self, command: &FormatCommand) -> Option<CommandOutcome> {
        self.run_command("inverse", |router, cx| {
            router.inverse(cx, command);
            CommandOutcome::Applied
        })
    }

    pub fn toggle(&mut self, command: &FormatCommand) -> Option<CommandOutcome> {
        self.run_command("toggle", |router, cx| router.toggle(cx, command))
    }

    fn run_command(
        &mut self,
        operation: &str,
        f: impl FnOnce(&CommandRouter<P>, &mut EditContext<'_>) -> CommandOutcome,
    ) -> Option<CommandOutcome> {
        if !self.state.alive(operation) {
            return None;
        }
        let state = &mut self.state;
        let mut cx = EditContext::new(&mut state.doc, state.root, state.selection);
        let outcome = f(&self.router, &mut cx);
        let selection = cx.selection;
        state.selection = selection;
        if outcome == CommandOutcome::OpenLinkEditor {
            let cx = EditContext::new(&mut state.doc, state.root, state.selection);
            self.link_editor.open(&cx);
        }
        self.refresh_interface();
        self.notify_change();
        Some(outcome)
    }

    /// Apply `url` through the open link editor. `None` keeps the draft's
    /// href; an empty url removes the link.
    pub fn commit_link(&mut self, url: Option<&str>) -> bool {
        if !self.state.alive("commit_link") || !self.link_editor.is_open() {
            return false;
        }
        let state = &mut self.state;
        let mut cx = EditContext::new(&mut state.doc, state.root, state.selection);
        let result = self.link_editor.commit(self.router.primitives(), &mut cx, url);
        let selection = cx.selection;
        state.selection = selection;
        if let Err(err) = result {
            tracing::warn!(target: "folio::commands", %err, "link update failed");
        }
        self.refresh_interface();
        self.notify_change();
        true
    }

    pub fn remove_link(&mut self) -> bool {
        if !self.state.alive("remove_link") || !self.link_editor.is_open() {
            return false;
        }
        let state = &mut self.state;
        let mut cx = EditContext::new(&mut state.doc, state.root, state.selection);
        let result = self.link_editor.remove(self.router.primitives(), &mut cx);
        let selection = cx.selection;
        state.selection = selection;
        if let Err(err) = result {
            tracing::warn!(target: "folio::commands", %err, "unlink failed");
        }
        self.refresh_interface();
        self.notify_change();
        true
    }

    /// Close the link editor without changes and put the selection back.
    pub fn cancel_link(&mut self) {
        if !self.link_editor.is_open() {
            return;
        }
        let saved = self.link_editor.cancel();
        let state = &mut self.state;
        if let Some(restored) = persist::restore(&state.doc, saved.as_ref()) {
            state.selection = Some(restored);
        }
    }

    /// Run the command bound to `combo`, if any. Returns whether a binding
    /// matched.
    pub fn handle_key(&mut self, combo: &str) -> bool {
        let combo = combo.trim();
        let bound = self
            .state
            .config
            .formatting_controls
            .key_bindings
            .iter()
            .find(|(keys, _)| keys.eq_ignore_ascii_case(combo))
            .map(|(_, command)| command.clone());
        let Some(command) = bound else {
            return false;
        };
        self.state
            .hooks
            .on_client_event(&ClientEvent::KeyDown(SmolStr::new(combo)));
        match command.as_str() {
            "undo" => {
                self.undo();
            }
            "redo" => {
                self.redo();
            }
            other => {
                self.toggle(&FormatCommand::parse(other, None));
            }
        }
        true
    }

    /// A mousedown landed somewhere on the page.
    pub fn document_mousedown(&mut self, inside: bool) {
        self.state.hooks.document_mousedown_hook(inside);
        if inside {
            self.state.hooks.on_client_event(&ClientEvent::MouseDown);
        } else {
            self.close_controls();
        }
    }
}

impl<P: FormattingPrimitives> Editor for RichEditor<P> {
    fn state(&self) -> &EditorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut EditorState {
        &mut self.state
    }

    fn get_data(&self, trim: bool, keep_media_tracking_attrs: bool) -> String {
        let state = &self.state;
        let mut out = Document::new();
        let copy = out.import(&state.doc, state.root);
        unwrap_media_holders(&mut out, copy, &state.config.media_holder_class);
        if state.config.run_iframe_sanitization {
            restore_iframes(&mut out, copy);
        }
        if !keep_media_tracking_attrs {
            strip_tracking_attrs(&mut out, copy, &state.config.img_key_attr);
        }
        if trim {
            trim_empty_blocks(&mut out, copy);
        }
        if state.config.filter_for_get_data {
            let clean = state.sanitizer.clean(&mut out, copy);
            inner_html(&out, clean)
        } else {
            inner_html(&out, copy)
        }
    }

    fn set_data(&mut self, data: &str, run_filter: bool, run_block_normalization: bool) {
        if !self.state.alive("set_data") {
            return;
        }
        self.load(data, run_filter, run_block_normalization);
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
        blockify(&mut state.doc, state.root);
        let blocks = state.doc.children(state.root).to_vec();
        scrub_spans_and_bad_attrs(&mut state.doc, &blocks);
        self.enforce_media_boundaries();
        let state = &mut self.state;
        ensure_minimum_block(&mut state.doc, state.root);

        if inner_html(&state.doc, state.root) != before {
            if saved.is_some() {
                state.selection = persist::restore(&state.doc, saved.as_ref());
            }
            self.refresh_interface();
            self.notify_change();
        } else {
            self.refresh_interface();
        }
    }

    fn refresh_interface(&mut self) {
        if self.state.torn_down {
            return;
        }
        if self.enforce_media_boundaries() {
            self.state.touch();
        }
        let state = &mut self.state;
        let controls = state.config.formatting_controls.commands();
        let cx = EditContext::new(&mut state.doc, state.root, state.selection);
        self.active = self.router.active_commands(&cx, &controls);
        state.update_placeholder();
        state.hooks.on_interface_refresh(&self.active);
    }

    fn close_controls(&mut self) {
        self.cancel_link();
    }
}
