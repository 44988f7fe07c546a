//! Completion of palette drops.
//!
//! A palette drop captures its target slot at release time and then
//! waits for the template. By the time the template arrives the tree may
//! have changed, so the slot is checked again before splicing; a slot
//! that no longer exists means the new block is dropped on the floor.

use crate::cache::TemplateCache;
use crate::errors::LoadError;
use crate::lock;
use pagecraft_editor::{BlockId, BlockInstance, Canvas, Mutation, PendingInsertion};
use std::sync::Mutex;

/// What became of a palette drop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionOutcome {
    Inserted(BlockId),
    /// The target slot disappeared while the template was loading
    Discarded,
}

/// Load the template for `pending` and splice a fresh block into its
/// captured slot. A load failure leaves the canvas untouched.
pub async fn complete_insertion(
    cache: &TemplateCache,
    canvas: &Mutex<Canvas>,
    pending: PendingInsertion,
) -> Result<InsertionOutcome, LoadError> {
    let cached = cache.load(&pending.template_ref).await?;

    let mut canvas = lock(canvas);
    let slot = pending.target.slot;
    if !canvas.has_slot(&slot) {
        tracing::info!(template = %pending.template_ref, slot = %slot, "drop target vanished, discarding block");
        return Ok(InsertionOutcome::Discarded);
    }

    let id = canvas.ids().next_id();
    let block = BlockInstance::from_template(id, &cached.template, None);
    let result = canvas.apply(Mutation::InsertBlock {
        slot,
        index: pending.target.index,
        block,
    });

    match result {
        Ok(result) => {
            tracing::debug!(template = %pending.template_ref, block = result.block_id, "inserted block");
            Ok(InsertionOutcome::Inserted(result.block_id))
        }
        Err(e) => {
            tracing::warn!(template = %pending.template_ref, error = %e, "insertion rejected, discarding block");
            Ok(InsertionOutcome::Discarded)
        }
    }
}
