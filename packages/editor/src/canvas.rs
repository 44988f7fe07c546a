//! # Canvas
//!
//! The editable page: a root drop area holding the tree of block
//! instances, the shared id allocator, a revision counter and the change
//! feed.
//!
//! ## Lifecycle
//!
//! ```text
//! Palette/Schema → Insert/Replace → Mutate → Render → Serialize
//!                        ↓             ↓
//!                    CanvasChange on the change feed
//! ```
//!
//! The revision only moves on interactive edits and whole-tree loads.
//! Restoring a history snapshot leaves it untouched, which is how the
//! history recorder tells its own restores apart from new edits.

use crate::block::{BlockId, BlockInstance, DropArea, IdAllocator, SlotRef};
use crate::changes::{CanvasChange, ChangeFeed, ChangeKind, ChangeOrigin};
use crate::mutations::{Mutation, MutationError};
use crate::EditorError;
use pagecraft_markup::scan_block_ids;
use tokio::sync::broadcast;

/// Name of the canvas root's only drop area
pub const ROOT_AREA: &str = "root";

/// Tree state captured for undo/redo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasSnapshot {
    pub blocks: Vec<BlockInstance>,
}

/// Result of applying a mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationResult {
    /// Canvas revision after the mutation
    pub revision: u64,
    /// Block produced or touched by the mutation
    pub block_id: BlockId,
}

/// Editable block tree
#[derive(Debug)]
pub struct Canvas {
    root: DropArea,
    ids: IdAllocator,
    revision: u64,
    feed: ChangeFeed,
}

impl Canvas {
    pub fn new() -> Self {
        Self::with_ids(IdAllocator::new())
    }

    /// Create a canvas drawing ids from a shared allocator
    pub fn with_ids(ids: IdAllocator) -> Self {
        Self {
            root: DropArea::new(ROOT_AREA),
            ids,
            revision: 0,
            feed: ChangeFeed::new(),
        }
    }

    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Top-level blocks, in order
    pub fn blocks(&self) -> &[BlockInstance] {
        &self.root.blocks
    }

    pub fn root(&self) -> &DropArea {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.blocks.is_empty()
    }

    /// Total number of blocks on the canvas
    pub fn block_count(&self) -> usize {
        self.root.blocks.iter().map(BlockInstance::subtree_len).sum()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CanvasChange> {
        self.feed.subscribe()
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Depth-first, pre-order walk over every block
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a BlockInstance)) {
        for block in &self.root.blocks {
            block.walk(visit);
        }
    }

    pub fn find(&self, id: BlockId) -> Option<&BlockInstance> {
        find_in(&self.root.blocks, id)
    }

    pub(crate) fn find_mut(&mut self, id: BlockId) -> Option<&mut BlockInstance> {
        find_in_mut(&mut self.root.blocks, id)
    }

    pub fn slot(&self, slot: &SlotRef) -> Option<&DropArea> {
        match slot.owner {
            None if slot.area == ROOT_AREA => Some(&self.root),
            None => None,
            Some(owner) => self.find(owner)?.area(&slot.area),
        }
    }

    pub(crate) fn slot_mut(&mut self, slot: &SlotRef) -> Option<&mut DropArea> {
        match slot.owner {
            None if slot.area == ROOT_AREA => Some(&mut self.root),
            None => None,
            Some(owner) => self.find_mut(owner)?.area_mut(&slot.area),
        }
    }

    pub fn has_slot(&self, slot: &SlotRef) -> bool {
        self.slot(slot).is_some()
    }

    /// Slot holding `id` and its index there
    pub fn locate(&self, id: BlockId) -> Option<(SlotRef, usize)> {
        locate_in(&self.root, None, id)
    }

    /// Apply a mutation, bump the revision and publish the change
    pub fn apply(&mut self, mutation: Mutation) -> Result<MutationResult, EditorError> {
        let block_id = mutation.apply(self)?;
        self.revision += 1;

        self.feed.emit(CanvasChange {
            revision: self.revision,
            kind: mutation.kind(),
            origin: ChangeOrigin::Edit,
            block_id: Some(block_id),
        });

        Ok(MutationResult {
            revision: self.revision,
            block_id,
        })
    }

    /// Detach a block (with its subtree) from wherever it lives
    pub(crate) fn detach(&mut self, id: BlockId) -> Result<BlockInstance, MutationError> {
        let (slot, index) = self.locate(id).ok_or(MutationError::BlockNotFound(id))?;
        let area = self
            .slot_mut(&slot)
            .ok_or(MutationError::BlockNotFound(id))?;
        Ok(area.blocks.remove(index))
    }

    pub fn snapshot(&self) -> CanvasSnapshot {
        CanvasSnapshot {
            blocks: self.root.blocks.clone(),
        }
    }

    /// Put a history snapshot back. Does not move the revision.
    pub fn restore(&mut self, snapshot: &CanvasSnapshot) {
        self.root.blocks = snapshot.blocks.clone();
        self.observe_tree_ids();

        self.feed.emit(CanvasChange {
            revision: self.revision,
            kind: ChangeKind::Restored,
            origin: ChangeOrigin::History,
            block_id: None,
        });
    }

    /// Replace the whole tree, as after loading a document
    pub fn replace(&mut self, blocks: Vec<BlockInstance>) {
        self.root.blocks = blocks;
        self.observe_tree_ids();
        self.revision += 1;

        self.feed.emit(CanvasChange {
            revision: self.revision,
            kind: ChangeKind::Replaced,
            origin: ChangeOrigin::Load,
            block_id: None,
        });
    }

    /// Feed `data-block-id` markers found in previously rendered markup
    /// to the allocator. Returns the largest marker seen.
    pub fn observe_markup(&self, markup: &str) -> Option<BlockId> {
        let max = scan_block_ids(markup).into_iter().max()?;
        self.ids.observe(max);
        Some(max)
    }

    fn observe_tree_ids(&self) {
        if let Some(max) = self.root.blocks.iter().map(BlockInstance::max_id).max() {
            self.ids.observe(max);
        }
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

fn find_in(blocks: &[BlockInstance], id: BlockId) -> Option<&BlockInstance> {
    for block in blocks {
        if block.id == id {
            return Some(block);
        }
        for area in &block.areas {
            if let Some(found) = find_in(&area.blocks, id) {
                return Some(found);
            }
        }
    }
    None
}

fn find_in_mut(blocks: &mut [BlockInstance], id: BlockId) -> Option<&mut BlockInstance> {
    for block in blocks {
        if block.id == id {
            return Some(block);
        }
        if !block.contains(id) {
            continue;
        }
        for area in &mut block.areas {
            if let Some(found) = find_in_mut(&mut area.blocks, id) {
                return Some(found);
            }
        }
    }
    None
}

fn locate_in(area: &DropArea, owner: Option<BlockId>, id: BlockId) -> Option<(SlotRef, usize)> {
    for (index, block) in area.blocks.iter().enumerate() {
        if block.id == id {
            let slot = SlotRef {
                owner,
                area: area.name.clone(),
            };
            return Some((slot, index));
        }
        for child_area in &block.areas {
            if let Some(found) = locate_in(child_area, Some(block.id), id) {
                return Some(found);
            }
        }
    }
    None
}
