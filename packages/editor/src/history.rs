//! # Undo/Redo History
//!
//! Linear snapshot history with a cursor.
//!
//! ## Design
//!
//! - The history starts with the tree state it was created from
//! - Recording truncates everything after the cursor, then appends
//! - Undo moves the cursor back (no-op at the first state)
//! - Redo moves it forward (no-op at the tail)
//! - At most `max_levels` undo steps are kept; the oldest drop first
//!
//! The history also remembers the canvas revision it last caught up
//! with, so a recorder can tell whether there is anything new to record.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = History::new(canvas.snapshot(), canvas.revision());
//!
//! canvas.apply(mutation)?;
//! history.record(canvas.snapshot(), canvas.revision());
//!
//! if let Some(previous) = history.undo() {
//!     canvas.restore(previous);
//! }
//! ```

use crate::canvas::CanvasSnapshot;

/// Default number of undo levels
pub const DEFAULT_MAX_LEVELS: usize = 100;

#[derive(Debug, Clone)]
pub struct History {
    /// Recorded states, oldest first
    states: Vec<CanvasSnapshot>,

    /// Index of the state the canvas currently shows
    cursor: usize,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    /// Canvas revision covered by the latest record
    synced_revision: u64,
}

impl History {
    /// Create a history whose first state is `initial`
    pub fn new(initial: CanvasSnapshot, revision: u64) -> Self {
        Self::with_max_levels(initial, revision, DEFAULT_MAX_LEVELS)
    }

    pub fn with_max_levels(initial: CanvasSnapshot, revision: u64, max_levels: usize) -> Self {
        Self {
            states: vec![initial],
            cursor: 0,
            max_levels,
            synced_revision: revision,
        }
    }

    /// Record a new state taken at `revision`
    pub fn record(&mut self, snapshot: CanvasSnapshot, revision: u64) {
        // A fresh edit invalidates the redo branch
        self.states.truncate(self.cursor + 1);
        self.states.push(snapshot);

        if self.max_levels > 0 && self.states.len() > self.max_levels + 1 {
            let excess = self.states.len() - (self.max_levels + 1);
            self.states.drain(..excess);
        }

        self.cursor = self.states.len() - 1;
        self.synced_revision = revision;
    }

    /// Step back one state
    pub fn undo(&mut self) -> Option<&CanvasSnapshot> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.states.get(self.cursor)
    }

    /// Step forward one state
    pub fn redo(&mut self) -> Option<&CanvasSnapshot> {
        if self.cursor + 1 >= self.states.len() {
            return None;
        }
        self.cursor += 1;
        self.states.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.states.len()
    }

    /// Number of undo steps available
    pub fn undo_levels(&self) -> usize {
        self.cursor
    }

    /// Number of redo steps available
    pub fn redo_levels(&self) -> usize {
        self.states.len() - self.cursor - 1
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn current(&self) -> &CanvasSnapshot {
        &self.states[self.cursor]
    }

    /// Whether the canvas has moved past the last recorded revision
    pub fn is_behind(&self, revision: u64) -> bool {
        revision != self.synced_revision
    }

    pub fn synced_revision(&self) -> u64 {
        self.synced_revision
    }

    /// Forget every state but the current one
    pub fn clear(&mut self) {
        let current = self.states.swap_remove(self.cursor);
        self.states.clear();
        self.states.push(current);
        self.cursor = 0;
    }

    /// Drop all history and start over from `initial`
    pub fn reset(&mut self, initial: CanvasSnapshot, revision: u64) {
        self.states.clear();
        self.states.push(initial);
        self.cursor = 0;
        self.synced_revision = revision;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockInstance;
    use pagecraft_markup::Settings;

    fn state(ids: &[u64]) -> CanvasSnapshot {
        CanvasSnapshot {
            blocks: ids
                .iter()
                .map(|id| BlockInstance {
                    id: *id,
                    template_ref: "t".to_string(),
                    original_markup: String::new(),
                    settings: Settings::new(),
                    areas: vec![],
                })
                .collect(),
        }
    }

    #[test]
    fn test_history_creation() {
        let history = History::new(state(&[]), 0);
        assert_eq!(history.undo_levels(), 0);
        assert_eq!(history.redo_levels(), 0);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_undo_at_start_is_noop() {
        let mut history = History::new(state(&[]), 0);
        assert!(history.undo().is_none());
        assert_eq!(history.cursor(), 0);
    }

    #[test]
    fn test_redo_at_tail_is_noop() {
        let mut history = History::new(state(&[]), 0);
        history.record(state(&[1]), 1);
        assert!(history.redo().is_none());
        assert_eq!(history.cursor(), 1);
    }

    #[test]
    fn test_undo_undo_redo() {
        let mut history = History::new(state(&[]), 0);
        history.record(state(&[1]), 1);
        history.record(state(&[1, 2]), 2);
        history.record(state(&[1, 2, 3]), 3);

        assert_eq!(history.undo(), Some(&state(&[1, 2])));
        assert_eq!(history.undo(), Some(&state(&[1])));
        assert_eq!(history.redo(), Some(&state(&[1, 2])));
    }

    #[test]
    fn test_new_record_discards_redo() {
        let mut history = History::new(state(&[]), 0);
        history.record(state(&[1]), 1);
        history.record(state(&[1, 2]), 2);
        history.undo();
        assert_eq!(history.redo_levels(), 1);

        history.record(state(&[1, 4]), 3);

        assert_eq!(history.redo_levels(), 0);
        assert!(history.redo().is_none());
        assert_eq!(history.current(), &state(&[1, 4]));
    }

    #[test]
    fn test_max_levels_enforced() {
        let mut history = History::with_max_levels(state(&[]), 0, 2);
        for i in 1..=3 {
            history.record(state(&[i]), i);
        }

        assert_eq!(history.undo_levels(), 2);
        history.undo();
        history.undo();
        assert_eq!(history.current(), &state(&[1]));
        assert!(history.undo().is_none());
    }

    #[test]
    fn test_is_behind_tracks_revision() {
        let mut history = History::new(state(&[]), 0);
        assert!(!history.is_behind(0));
        assert!(history.is_behind(2));

        history.record(state(&[1]), 2);
        assert!(!history.is_behind(2));
    }

    #[test]
    fn test_clear_keeps_current_state() {
        let mut history = History::new(state(&[]), 0);
        history.record(state(&[1]), 1);
        history.record(state(&[1, 2]), 2);
        history.undo();

        history.clear();

        assert_eq!(history.len(), 1);
        assert_eq!(history.current(), &state(&[1]));
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_reset() {
        let mut history = History::new(state(&[]), 0);
        history.record(state(&[1]), 1);
        history.reset(state(&[5]), 9);

        assert_eq!(history.len(), 1);
        assert!(!history.can_undo());
        assert_eq!(history.synced_revision(), 9);
    }
}
