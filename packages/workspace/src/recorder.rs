//! # History recorder
//!
//! Subscribes to the canvas change feed and snapshots the tree into the
//! [`History`] once changes settle:
//!
//! ```text
//! change ─→ (re)arm quiescence timer ─→ timer fires ─→ record_if_changed
//!    ↑ origin History is ignored
//! ```
//!
//! A burst of changes inside the quiescence window gives one snapshot.
//! Undo and redo flush anything still pending first, so the step they
//! take is always the one the user just made.

use crate::lock;
use pagecraft_editor::{Canvas, CanvasSnapshot, ChangeOrigin, History};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// Default quiescence window
pub const DEFAULT_QUIESCENCE: Duration = Duration::from_millis(100);

/// Snapshot the canvas into `history` if it moved past the last record
pub fn record_if_changed(canvas: &Mutex<Canvas>, history: &Mutex<History>) -> bool {
    let (snapshot, revision) = {
        let canvas = lock(canvas);
        (canvas.snapshot(), canvas.revision())
    };

    let mut history = lock(history);
    if !history.is_behind(revision) {
        return false;
    }
    history.record(snapshot, revision);
    tracing::debug!(revision, levels = history.undo_levels(), "recorded history snapshot");
    true
}

/// Background task feeding a [`History`] from the canvas change feed.
/// Dropping the recorder stops the task.
pub struct HistoryRecorder {
    canvas: Arc<Mutex<Canvas>>,
    history: Arc<Mutex<History>>,
    task: JoinHandle<()>,
}

impl HistoryRecorder {
    /// Start recording. The history is seeded with the canvas as it is now.
    pub fn spawn(canvas: Arc<Mutex<Canvas>>, max_levels: usize, quiescence: Duration) -> Self {
        let (history, mut changes) = {
            let c = lock(&canvas);
            let history = History::with_max_levels(c.snapshot(), c.revision(), max_levels);
            (Arc::new(Mutex::new(history)), c.subscribe())
        };

        let task = {
            let canvas = Arc::clone(&canvas);
            let history = Arc::clone(&history);
            tokio::spawn(async move {
                let mut deadline: Option<Instant> = None;
                loop {
                    tokio::select! {
                        change = changes.recv() => match change {
                            Ok(change) if change.origin == ChangeOrigin::History => {}
                            Ok(_) => deadline = Some(Instant::now() + quiescence),
                            Err(RecvError::Lagged(missed)) => {
                                tracing::debug!(missed, "history recorder lagged");
                                deadline = Some(Instant::now() + quiescence);
                            }
                            Err(RecvError::Closed) => break,
                        },
                        _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                            deadline = None;
                            record_if_changed(&canvas, &history);
                        }
                    }
                }
                tracing::debug!("history recorder stopped");
            })
        };

        Self {
            canvas,
            history,
            task,
        }
    }

    pub fn history(&self) -> &Arc<Mutex<History>> {
        &self.history
    }

    /// Record pending changes right away
    pub fn flush(&self) -> bool {
        record_if_changed(&self.canvas, &self.history)
    }

    /// Step back one state. Returns false at the start of history.
    pub fn undo(&self) -> bool {
        self.flush();
        let snapshot = lock(&self.history).undo().cloned();
        self.restore(snapshot)
    }

    /// Step forward one state. Returns false at the tail.
    pub fn redo(&self) -> bool {
        self.flush();
        let snapshot = lock(&self.history).redo().cloned();
        self.restore(snapshot)
    }

    fn restore(&self, snapshot: Option<CanvasSnapshot>) -> bool {
        match snapshot {
            Some(snapshot) => {
                lock(&self.canvas).restore(&snapshot);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        lock(&self.history).can_undo()
    }

    pub fn can_redo(&self) -> bool {
        lock(&self.history).can_redo()
    }

    /// Start history over from the canvas as it is now
    pub fn reset(&self) {
        let (snapshot, revision) = {
            let canvas = lock(&self.canvas);
            (canvas.snapshot(), canvas.revision())
        };
        lock(&self.history).reset(snapshot, revision);
    }
}

impl Drop for HistoryRecorder {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecraft_editor::{BlockInstance, Mutation, SlotRef, DEFAULT_MAX_LEVELS};

    fn text(id: u64) -> BlockInstance {
        BlockInstance {
            id,
            template_ref: "text".to_string(),
            original_markup: "<p>{t}</p>".to_string(),
            settings: Default::default(),
            areas: vec![],
        }
    }

    fn insert(canvas: &Mutex<Canvas>, id: u64) {
        lock(canvas)
            .apply(Mutation::InsertBlock {
                slot: SlotRef::root(),
                index: usize::MAX,
                block: text(id),
            })
            .unwrap();
    }

    fn settle() -> tokio::time::Sleep {
        tokio::time::sleep(DEFAULT_QUIESCENCE * 2)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_records_once() {
        let canvas = Arc::new(Mutex::new(Canvas::new()));
        let recorder = HistoryRecorder::spawn(Arc::clone(&canvas), DEFAULT_MAX_LEVELS, DEFAULT_QUIESCENCE);

        insert(&canvas, 1);
        insert(&canvas, 2);
        insert(&canvas, 3);
        settle().await;

        let history = lock(recorder.history());
        assert_eq!(history.len(), 2);
        assert_eq!(history.current().blocks.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_edits_record_separately() {
        let canvas = Arc::new(Mutex::new(Canvas::new()));
        let recorder = HistoryRecorder::spawn(Arc::clone(&canvas), DEFAULT_MAX_LEVELS, DEFAULT_QUIESCENCE);

        for id in 1..=3 {
            insert(&canvas, id);
            settle().await;
        }

        assert_eq!(lock(recorder.history()).undo_levels(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_undo_undo_redo_reaches_first_edit() {
        let canvas = Arc::new(Mutex::new(Canvas::new()));
        let recorder = HistoryRecorder::spawn(Arc::clone(&canvas), DEFAULT_MAX_LEVELS, DEFAULT_QUIESCENCE);

        insert(&canvas, 1);
        settle().await;
        let e1 = lock(&canvas).snapshot();
        insert(&canvas, 2);
        settle().await;
        let e2 = lock(&canvas).snapshot();
        insert(&canvas, 3);
        settle().await;

        assert!(recorder.undo());
        assert!(recorder.undo());
        assert_eq!(lock(&canvas).snapshot(), e1);
        assert!(recorder.redo());
        assert_eq!(lock(&canvas).snapshot(), e2);

        // Restores never come back as new recordings
        settle().await;
        assert_eq!(lock(recorder.history()).redo_levels(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_edit_after_undo_discards_redo() {
        let canvas = Arc::new(Mutex::new(Canvas::new()));
        let recorder = HistoryRecorder::spawn(Arc::clone(&canvas), DEFAULT_MAX_LEVELS, DEFAULT_QUIESCENCE);

        for id in 1..=3 {
            insert(&canvas, id);
            settle().await;
        }

        assert!(recorder.undo());
        insert(&canvas, 4);
        settle().await;

        assert!(!recorder.can_redo());
        assert!(!recorder.redo());
        let ids: Vec<_> = lock(&canvas).blocks().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_undo_flushes_pending_edit() {
        let canvas = Arc::new(Mutex::new(Canvas::new()));
        let recorder = HistoryRecorder::spawn(Arc::clone(&canvas), DEFAULT_MAX_LEVELS, DEFAULT_QUIESCENCE);

        insert(&canvas, 1);
        settle().await;
        // Undo before the quiescence timer had a chance to fire
        insert(&canvas, 2);
        assert!(recorder.undo());

        assert_eq!(lock(&canvas).blocks().len(), 1);
        assert!(recorder.can_redo());
    }
}
