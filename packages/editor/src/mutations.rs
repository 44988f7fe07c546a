//! # Canvas Mutations
//!
//! Semantic operations on the block tree.
//!
//! ## Mutation Semantics
//!
//! ### InsertBlock
//! - Splices a block into a slot at an index (clamped to the slot length)
//! - Fails if the slot no longer exists, so a late template load cannot
//!   land somewhere else
//! - Fails if any id in the inserted subtree is already on the canvas
//!
//! ### MoveBlock
//! - Detaches the block and re-splices it; identity is preserved
//! - The index is relative to the slot *without* the moved block
//! - Fails if the target slot lies inside the moved block
//!
//! ### RemoveBlock
//! - Removes the block and every block nested beneath it
//!
//! ### ApplySettings
//! - Atomic replacement of the settings dictionary
//!
//! ### DuplicateBlock
//! - Deep copy with fresh ids, placed right after the original

use crate::block::{BlockId, BlockInstance, SlotRef};
use crate::canvas::Canvas;
use crate::changes::ChangeKind;
use pagecraft_markup::Settings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Semantic mutations (intent-preserving operations)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Mutation {
    /// Insert a block into a slot at index
    InsertBlock {
        slot: SlotRef,
        index: usize,
        block: BlockInstance,
    },

    /// Move a block to a slot at index
    MoveBlock {
        block_id: BlockId,
        target: SlotRef,
        index: usize,
    },

    /// Remove a block and its descendants
    RemoveBlock { block_id: BlockId },

    /// Replace a block's settings
    ApplySettings { block_id: BlockId, settings: Settings },

    /// Copy a block (and its subtree) next to itself
    DuplicateBlock { block_id: BlockId },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),

    #[error("Slot not found: {0}")]
    SlotNotFound(SlotRef),

    #[error("Would create cycle: block {0} cannot move into its own subtree")]
    CycleDetected(BlockId),

    #[error("Block id already on the canvas: {0}")]
    DuplicateId(BlockId),
}

impl Mutation {
    /// Kind of change this mutation produces
    pub fn kind(&self) -> ChangeKind {
        match self {
            Mutation::InsertBlock { .. } => ChangeKind::Inserted,
            Mutation::MoveBlock { .. } => ChangeKind::Moved,
            Mutation::RemoveBlock { .. } => ChangeKind::Removed,
            Mutation::ApplySettings { .. } => ChangeKind::SettingsApplied,
            Mutation::DuplicateBlock { .. } => ChangeKind::Duplicated,
        }
    }

    /// Validate without changing anything
    pub fn validate(&self, canvas: &Canvas) -> Result<(), MutationError> {
        match self {
            Mutation::InsertBlock { slot, block, .. } => {
                if !canvas.has_slot(slot) {
                    return Err(MutationError::SlotNotFound(slot.clone()));
                }
                let mut duplicate = None;
                block.walk(&mut |b| {
                    if duplicate.is_none() && canvas.find(b.id).is_some() {
                        duplicate = Some(b.id);
                    }
                });
                match duplicate {
                    Some(id) => Err(MutationError::DuplicateId(id)),
                    None => Ok(()),
                }
            }

            Mutation::MoveBlock { block_id, target, .. } => {
                let block = canvas
                    .find(*block_id)
                    .ok_or(MutationError::BlockNotFound(*block_id))?;
                if !canvas.has_slot(target) {
                    return Err(MutationError::SlotNotFound(target.clone()));
                }
                match target.owner {
                    Some(owner) if block.contains(owner) => {
                        Err(MutationError::CycleDetected(*block_id))
                    }
                    _ => Ok(()),
                }
            }

            Mutation::RemoveBlock { block_id }
            | Mutation::ApplySettings { block_id, .. }
            | Mutation::DuplicateBlock { block_id } => canvas
                .find(*block_id)
                .map(|_| ())
                .ok_or(MutationError::BlockNotFound(*block_id)),
        }
    }

    /// Apply to the canvas tree with validation.
    ///
    /// Returns the id of the block the mutation produced or touched.
    pub(crate) fn apply(&self, canvas: &mut Canvas) -> Result<BlockId, MutationError> {
        self.validate(canvas)?;

        match self {
            Mutation::InsertBlock { slot, index, block } => {
                Self::apply_insert(canvas, slot, *index, block.clone())
            }

            Mutation::MoveBlock {
                block_id,
                target,
                index,
            } => Self::apply_move(canvas, *block_id, target, *index),

            Mutation::RemoveBlock { block_id } => {
                canvas.detach(*block_id)?;
                Ok(*block_id)
            }

            Mutation::ApplySettings { block_id, settings } => {
                let block = canvas
                    .find_mut(*block_id)
                    .ok_or(MutationError::BlockNotFound(*block_id))?;
                block.settings = settings.clone();
                Ok(*block_id)
            }

            Mutation::DuplicateBlock { block_id } => Self::apply_duplicate(canvas, *block_id),
        }
    }

    fn apply_insert(
        canvas: &mut Canvas,
        slot: &SlotRef,
        index: usize,
        block: BlockInstance,
    ) -> Result<BlockId, MutationError> {
        let id = block.id;
        canvas.ids().observe(block.max_id());

        let area = canvas
            .slot_mut(slot)
            .ok_or_else(|| MutationError::SlotNotFound(slot.clone()))?;
        let insert_index = index.min(area.blocks.len());
        area.blocks.insert(insert_index, block);
        Ok(id)
    }

    fn apply_move(
        canvas: &mut Canvas,
        block_id: BlockId,
        target: &SlotRef,
        index: usize,
    ) -> Result<BlockId, MutationError> {
        // Validation guarantees the target survives the detach
        let block = canvas.detach(block_id)?;

        let area = canvas
            .slot_mut(target)
            .ok_or_else(|| MutationError::SlotNotFound(target.clone()))?;
        let insert_index = index.min(area.blocks.len());
        area.blocks.insert(insert_index, block);
        Ok(block_id)
    }

    fn apply_duplicate(canvas: &mut Canvas, block_id: BlockId) -> Result<BlockId, MutationError> {
        let (slot, index) = canvas
            .locate(block_id)
            .ok_or(MutationError::BlockNotFound(block_id))?;
        let mut copy = canvas
            .find(block_id)
            .cloned()
            .ok_or(MutationError::BlockNotFound(block_id))?;
        copy.reassign_ids(canvas.ids());
        let new_id = copy.id;

        let area = canvas
            .slot_mut(&slot)
            .ok_or_else(|| MutationError::SlotNotFound(slot.clone()))?;
        area.blocks.insert(index + 1, copy);
        Ok(new_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::DropArea;

    fn block(id: BlockId, areas: &[&str]) -> BlockInstance {
        BlockInstance {
            id,
            template_ref: "box".to_string(),
            original_markup: "<div></div>".to_string(),
            settings: Settings::new(),
            areas: areas.iter().map(|a| DropArea::new(*a)).collect(),
        }
    }

    fn insert(canvas: &mut Canvas, slot: SlotRef, index: usize, b: BlockInstance) {
        canvas
            .apply(Mutation::InsertBlock {
                slot,
                index,
                block: b,
            })
            .unwrap();
    }

    #[test]
    fn test_insert_clamps_index() {
        let mut canvas = Canvas::new();
        insert(&mut canvas, SlotRef::root(), 10, block(1, &[]));
        insert(&mut canvas, SlotRef::root(), 0, block(2, &[]));

        let ids: Vec<_> = canvas.blocks().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_insert_into_missing_slot_fails() {
        let mut canvas = Canvas::new();
        let result = canvas.apply(Mutation::InsertBlock {
            slot: SlotRef::area(99, "main"),
            index: 0,
            block: block(1, &[]),
        });
        assert!(result.is_err());
        assert!(canvas.blocks().is_empty());
    }

    #[test]
    fn test_insert_duplicate_id_fails() {
        let mut canvas = Canvas::new();
        insert(&mut canvas, SlotRef::root(), 0, block(1, &[]));

        let err = Mutation::InsertBlock {
            slot: SlotRef::root(),
            index: 0,
            block: block(1, &[]),
        }
        .validate(&canvas)
        .unwrap_err();
        assert_eq!(err, MutationError::DuplicateId(1));
    }

    #[test]
    fn test_move_into_own_subtree_rejected() {
        let mut canvas = Canvas::new();
        insert(&mut canvas, SlotRef::root(), 0, block(1, &["main"]));
        insert(&mut canvas, SlotRef::area(1, "main"), 0, block(2, &["main"]));

        let err = Mutation::MoveBlock {
            block_id: 1,
            target: SlotRef::area(2, "main"),
            index: 0,
        }
        .validate(&canvas)
        .unwrap_err();
        assert_eq!(err, MutationError::CycleDetected(1));

        let err = Mutation::MoveBlock {
            block_id: 1,
            target: SlotRef::area(1, "main"),
            index: 0,
        }
        .validate(&canvas)
        .unwrap_err();
        assert_eq!(err, MutationError::CycleDetected(1));
    }

    #[test]
    fn test_move_preserves_identity() {
        let mut canvas = Canvas::new();
        insert(&mut canvas, SlotRef::root(), 0, block(1, &["main"]));
        insert(&mut canvas, SlotRef::root(), 1, block(2, &[]));

        canvas
            .apply(Mutation::MoveBlock {
                block_id: 2,
                target: SlotRef::area(1, "main"),
                index: 0,
            })
            .unwrap();

        assert_eq!(canvas.blocks().len(), 1);
        assert_eq!(canvas.locate(2), Some((SlotRef::area(1, "main"), 0)));
    }

    #[test]
    fn test_remove_cascades() {
        let mut canvas = Canvas::new();
        insert(&mut canvas, SlotRef::root(), 0, block(1, &["main"]));
        insert(&mut canvas, SlotRef::area(1, "main"), 0, block(2, &["main"]));
        insert(&mut canvas, SlotRef::area(2, "main"), 0, block(3, &[]));

        canvas.apply(Mutation::RemoveBlock { block_id: 1 }).unwrap();

        assert!(canvas.find(1).is_none());
        assert!(canvas.find(2).is_none());
        assert!(canvas.find(3).is_none());
        assert_eq!(canvas.block_count(), 0);
    }

    #[test]
    fn test_apply_settings_replaces_dictionary() {
        let mut canvas = Canvas::new();
        let mut b = block(1, &[]);
        b.settings.insert("old".to_string(), "x".to_string());
        insert(&mut canvas, SlotRef::root(), 0, b);

        let mut settings = Settings::new();
        settings.insert("title".to_string(), "Hi".to_string());
        canvas
            .apply(Mutation::ApplySettings {
                block_id: 1,
                settings: settings.clone(),
            })
            .unwrap();

        assert_eq!(canvas.find(1).unwrap().settings, settings);
    }

    #[test]
    fn test_duplicate_places_copy_after_original() {
        let mut canvas = Canvas::new();
        insert(&mut canvas, SlotRef::root(), 0, block(1, &["main"]));
        insert(&mut canvas, SlotRef::area(1, "main"), 0, block(2, &[]));
        insert(&mut canvas, SlotRef::root(), 1, block(3, &[]));

        let result = canvas
            .apply(Mutation::DuplicateBlock { block_id: 1 })
            .unwrap();
        let copy_id = result.block_id;

        let ids: Vec<_> = canvas.blocks().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, copy_id, 3]);
        assert!(copy_id > 3);

        let copy = canvas.find(copy_id).unwrap();
        let child = &copy.area("main").unwrap().blocks[0];
        assert_ne!(child.id, 2);
        assert_eq!(canvas.block_count(), 5);
    }
}
