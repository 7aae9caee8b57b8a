//! Undo/redo management for editor operations.
//!
//! Provides:
//! - `UndoManager` trait for anything that can undo and redo
//! - `UndoTarget`, the snapshot/restore surface a document exposes
//! - `UndoHistory`, checkpoint-based history over whole-document snapshots

use crate::selection::SavedSelection;

/// Default number of undo steps kept.
pub const DEFAULT_MAX_STEPS: usize = 100;

/// Undo and redo over whole-document snapshots.
///
/// Edits still waiting on their debounced capture count as a step: `undo()`
/// records them first, so it can return `true` even when [`can_undo`]
/// was `false` a moment before.
///
/// [`can_undo`]: UndoManager::can_undo
pub trait UndoManager {
    /// Whether a recorded step exists. Pending, uncaptured edits are not
    /// counted.
    fn can_undo(&self) -> bool;

    fn can_redo(&self) -> bool;

    /// Restore the previous snapshot. Returns `false` when there was nothing
    /// recorded or pending, or the editor is torn down.
    fn undo(&mut self) -> bool;

    /// Reapply the snapshot the last undo left. Any new capture clears the
    /// redo side.
    fn redo(&mut self) -> bool;

    /// Drop both stacks. The current checkpoint stays as the baseline.
    fn clear_history(&mut self);
}

/// A recorded document state: serialized content plus where the selection was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoState {
    pub html: String,
    pub selection: Option<SavedSelection>,
}

/// The document side of undo: produce a snapshot, and put one back.
pub trait UndoTarget {
    fn snapshot(&self) -> UndoState;

    fn restore(&mut self, state: &UndoState);

    /// Runs after every restore, to reconcile state kept outside the
    /// serialized content.
    fn after_restore(&mut self) {}
}

/// What a change notification asks of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    /// The change came from an undo or redo restore; nothing to do.
    Suppressed,
    /// The change became the first checkpoint.
    Checkpointed,
    /// (Re)schedule a debounced [`UndoHistory::capture`].
    Debounce,
}

/// Checkpoint-based undo history.
#[derive(Debug, Clone)]
pub struct UndoHistory {
    checkpoint: Option<UndoState>,
    undo_stack: Vec<UndoState>,
    redo_stack: Vec<UndoState>,
    max_steps: usize,
    suppress_next: bool,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STEPS)
    }
}

impl UndoHistory {
    pub fn new(max_steps: usize) -> Self {
        Self {
            checkpoint: None,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_steps: max_steps.max(1),
            suppress_next: false,
        }
    }

    pub fn checkpoint(&self) -> Option<&UndoState> {
        self.checkpoint.as_ref()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Handle a document change notification.
    pub fn on_change(&mut self, target: &impl UndoTarget) -> ChangeAction {
        if self.suppress_next {
            self.suppress_next = false;
            tracing::trace!(target: "folio::undo", "change from restore ignored");
            return ChangeAction::Suppressed;
        }
        if self.checkpoint.is_none() {
            self.checkpoint = Some(target.snapshot());
            return ChangeAction::Checkpointed;
        }
        ChangeAction::Debounce
    }

    /// Record the current state if its content differs from the checkpoint.
    /// Returns whether a new undo entry was pushed.
    pub fn capture(&mut self, target: &impl UndoTarget) -> bool {
        let current = target.snapshot();
        let Some(checkpoint) = self.checkpoint.take() else {
            self.checkpoint = Some(current);
            return false;
        };
        if checkpoint.html == current.html {
            self.checkpoint = Some(checkpoint);
            return false;
        }

        self.undo_stack.push(checkpoint);
        self.checkpoint = Some(current);
        self.redo_stack.clear();

        // Trim if over max
        while self.undo_stack.len() > self.max_steps {
            self.undo_stack.remove(0);
        }
        tracing::trace!(target: "folio::undo", depth = self.undo_stack.len(), "checkpoint");
        true
    }

    /// Replace the checkpoint with the current state without recording a
    /// step, so the change since the last capture is never undone on its
    /// own.
    pub fn rebase(&mut self, target: &impl UndoTarget) {
        self.checkpoint = Some(target.snapshot());
        tracing::trace!(target: "folio::undo", "checkpoint rebased");
    }

    /// Step back one state. Pending edits are captured first.
    pub fn undo(&mut self, target: &mut impl UndoTarget) -> bool {
        self.capture(target);
        let Some(state) = self.undo_stack.pop() else {
            return false;
        };
        if let Some(checkpoint) = self.checkpoint.take() {
            self.redo_stack.push(checkpoint);
        }
        self.apply(target, &state);
        true
    }

    /// Step forward one state.
    pub fn redo(&mut self, target: &mut impl UndoTarget) -> bool {
        self.capture(target);
        let Some(state) = self.redo_stack.pop() else {
            return false;
        };
        if let Some(checkpoint) = self.checkpoint.take() {
            self.undo_stack.push(checkpoint);
        }
        self.apply(target, &state);
        true
    }

    fn apply(&mut self, target: &mut impl UndoTarget, state: &UndoState) {
        self.suppress_next = true;
        target.restore(state);
        target.after_restore();
        self.checkpoint = Some(target.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Text {
        html: String,
        restored: usize,
    }

    impl UndoTarget for Text {
        fn snapshot(&self) -> UndoState {
            UndoState {
                html: self.html.clone(),
                selection: None,
            }
        }

        fn restore(&mut self, state: &UndoState) {
            self.html = state.html.clone();
        }

        fn after_restore(&mut self) {
            self.restored += 1;
        }
    }

    fn edit(history: &mut UndoHistory, text: &mut Text, html: &str) {
        text.html = html.to_string();
        if history.on_change(text) == ChangeAction::Debounce {
            history.capture(text);
        }
    }

    #[test]
    fn test_three_edits_three_undos() {
        let mut history = UndoHistory::default();
        let mut text = Text::default();
        assert_eq!(history.on_change(&text), ChangeAction::Checkpointed);

        edit(&mut history, &mut text, "a");
        edit(&mut history, &mut text, "ab");
        edit(&mut history, &mut text, "abc");
        assert!(history.can_undo());

        assert!(history.undo(&mut text));
        assert_eq!(history.on_change(&text), ChangeAction::Suppressed);
        assert_eq!(history.on_change(&text), ChangeAction::Debounce);
        assert_eq!(text.html, "ab");
        assert!(history.undo(&mut text));
        assert!(history.undo(&mut text));
        assert_eq!(text.html, "");
        assert!(!history.undo(&mut text));
        assert_eq!(text.restored, 3);

        assert!(history.redo(&mut text));
        assert_eq!(text.html, "a");
        assert!(history.undo(&mut text));
        assert_eq!(text.html, "");
    }

    #[test]
    fn test_identical_content_is_not_recorded() {
        let mut history = UndoHistory::default();
        let mut text = Text::default();
        history.on_change(&text);
        assert!(!history.capture(&text));
        edit(&mut history, &mut text, "");
        assert!(!history.can_undo());
    }

    #[test]
    fn test_undo_captures_pending_edit() {
        let mut history = UndoHistory::default();
        let mut text = Text::default();
        history.on_change(&text);
        text.html = "typed".into();
        assert_eq!(history.on_change(&text), ChangeAction::Debounce);

        assert!(history.undo(&mut text));
        assert_eq!(text.html, "");
        assert!(history.redo(&mut text));
        assert_eq!(text.html, "typed");
    }

    #[test]
    fn test_rebase_folds_change_into_checkpoint() {
        let mut history = UndoHistory::default();
        let mut text = Text::default();
        history.on_change(&text);
        edit(&mut history, &mut text, "<img>");

        text.html = "<img width=\"4\">".into();
        history.rebase(&text);
        assert!(!history.capture(&text));

        assert!(history.undo(&mut text));
        assert_eq!(text.html, "");
        assert!(!history.undo(&mut text));
        assert!(history.redo(&mut text));
        assert_eq!(text.html, "<img width=\"4\">");
    }

    #[test]
    fn test_new_edit_clears_redo_and_max_steps_evicts() {
        let mut history = UndoHistory::new(2);
        let mut text = Text::default();
        history.on_change(&text);
        for html in ["1", "2", "3"] {
            edit(&mut history, &mut text, html);
        }
        assert!(history.undo(&mut text));
        assert!(history.undo(&mut text));
        assert!(!history.undo(&mut text));
        assert_eq!(text.html, "1");

        history.on_change(&text);
        edit(&mut history, &mut text, "x");
        assert!(!history.can_redo());
        history.clear_history();
        assert!(!history.can_undo());
    }
}
