//! Deferred editor work as explicit, cancelable tasks.
//!
//! Nothing here sleeps. Hosts call [`Timers::poll`] from whatever clock
//! they have (a browser timeout, a test loop) and run the tasks it returns.

use std::time::Duration;

use web_time::Instant;

/// Delay before a quiet period commits an undo checkpoint.
pub const UNDO_DEBOUNCE: Duration = Duration::from_millis(400);

/// Delay before toolbar state, media boundaries and the placeholder are
/// recomputed, so the platform's selection state settles first.
pub const REFRESH_DELAY: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    UndoCheckpoint,
    InterfaceRefresh,
    /// Inspect the document one tick after a keystroke landed.
    AfterInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Task {
    kind: TaskKind,
    due: Instant,
}

#[derive(Debug, Clone, Default)]
pub struct Timers {
    tasks: Vec<Task>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind`, replacing any pending task of the same kind.
    pub fn debounce(&mut self, kind: TaskKind, delay: Duration, now: Instant) {
        self.cancel(kind);
        self.schedule(kind, delay, now);
    }

    /// Schedule `kind` alongside any pending ones.
    pub fn schedule(&mut self, kind: TaskKind, delay: Duration, now: Instant) {
        self.tasks.push(Task {
            kind,
            due: now + delay,
        });
    }

    pub fn cancel(&mut self, kind: TaskKind) {
        self.tasks.retain(|t| t.kind != kind);
    }

    pub fn cancel_all(&mut self) {
        self.tasks.clear();
    }

    pub fn is_pending(&self, kind: TaskKind) -> bool {
        self.tasks.iter().any(|t| t.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// When the earliest pending task falls due.
    pub fn next_due(&self) -> Option<Instant> {
        self.tasks.iter().map(|t| t.due).min()
    }

    /// Remove and return every task due at `now`, earliest first.
    pub fn poll(&mut self, now: Instant) -> Vec<TaskKind> {
        let (mut due, pending): (Vec<Task>, Vec<Task>) =
            self.tasks.drain(..).partition(|t| t.due <= now);
        self.tasks = pending;
        due.sort_by_key(|t| t.due);
        due.into_iter().map(|t| t.kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debounce_resets_and_schedule_accumulates() {
        let start = Instant::now();
        let mut timers = Timers::new();
        timers.debounce(TaskKind::UndoCheckpoint, UNDO_DEBOUNCE, start);
        timers.debounce(
            TaskKind::UndoCheckpoint,
            UNDO_DEBOUNCE,
            start + Duration::from_millis(300),
        );
        timers.schedule(TaskKind::InterfaceRefresh, REFRESH_DELAY, start);
        timers.schedule(TaskKind::InterfaceRefresh, REFRESH_DELAY, start);

        assert_eq!(
            timers.poll(start + Duration::from_millis(500)),
            vec![TaskKind::InterfaceRefresh, TaskKind::InterfaceRefresh]
        );
        assert!(timers.is_pending(TaskKind::UndoCheckpoint));
        assert_eq!(
            timers.poll(start + Duration::from_millis(700)),
            vec![TaskKind::UndoCheckpoint]
        );
        assert!(timers.is_empty());
    }

    #[test]
    fn test_cancel_all() {
        let now = Instant::now();
        let mut timers = Timers::new();
        timers.schedule(TaskKind::AfterInput, Duration::ZERO, now);
        assert_eq!(timers.next_due(), Some(now));
        timers.cancel_all();
        assert!(timers.poll(now + Duration::from_secs(1)).is_empty());
    }
}
