//! Change notifications for the canvas tree.
//!
//! Every structural change (insert, move, remove, settings re-render,
//! history restore, full replacement) is published on a broadcast
//! channel. Subscribers such as the history recorder decide for
//! themselves which origins they care about.

use crate::block::BlockId;
use tokio::sync::broadcast;

const FEED_CAPACITY: usize = 256;

/// What happened to the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Inserted,
    Moved,
    Removed,
    SettingsApplied,
    Duplicated,
    Restored,
    Replaced,
}

/// Who caused the change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// Interactive editing through a mutation
    Edit,
    /// Undo/redo snapshot application
    History,
    /// Whole-tree replacement after deserialization
    Load,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasChange {
    /// Canvas revision after the change
    pub revision: u64,
    pub kind: ChangeKind,
    pub origin: ChangeOrigin,
    /// Block the change was about, if any
    pub block_id: Option<BlockId>,
}

/// Broadcast sender for [`CanvasChange`]s
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<CanvasChange>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CanvasChange> {
        self.sender.subscribe()
    }

    pub(crate) fn emit(&self, change: CanvasChange) {
        // No subscribers is not an error
        let _ = self.sender.send(change);
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
