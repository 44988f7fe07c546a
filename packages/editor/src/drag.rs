//! # Drag & drop controller
//!
//! Pointer-driven insertion from the palette and reordering of existing
//! blocks. The controller is a small state machine over one gesture:
//!
//! ```text
//! begin_palette / begin_move → hover* → release → DropIntent
//!                                  ↘ leave / cancel
//! ```
//!
//! The drop target is bound when the pointer is released. A palette drop
//! yields a [`PendingInsertion`] that is completed once the template has
//! loaded; it always targets the slot captured here, whatever happens to
//! the pointer in the meantime.

use crate::block::{BlockId, SlotRef};
use crate::mutations::Mutation;

/// Vertical extent of a rendered sibling inside a slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiblingBox {
    pub block_id: BlockId,
    pub top: f64,
    pub height: f64,
}

impl SiblingBox {
    pub fn midpoint(&self) -> f64 {
        self.top + self.height / 2.0
    }
}

/// Layout of a slot under the pointer, siblings in slot order
#[derive(Debug, Clone, PartialEq)]
pub struct SlotLayout {
    pub slot: SlotRef,
    pub siblings: Vec<SiblingBox>,
}

/// Index at which a drop at `pointer_y` lands.
///
/// The block goes right before the first sibling whose midpoint lies
/// below the pointer. A pointer exactly on a midpoint lands after that
/// sibling. `exclude` (the block being dragged) takes no part, and the
/// index is relative to the slot without it.
pub fn insertion_index(pointer_y: f64, siblings: &[SiblingBox], exclude: Option<BlockId>) -> usize {
    let mut index = 0;
    for sibling in siblings {
        if Some(sibling.block_id) == exclude {
            continue;
        }
        if sibling.midpoint() > pointer_y {
            return index;
        }
        index += 1;
    }
    index
}

/// What is being dragged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragSource {
    /// A new block from the palette
    Palette { template_ref: String },
    /// A block already on the canvas
    Existing { block_id: BlockId },
}

/// Where a drop lands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTarget {
    pub slot: SlotRef,
    pub index: usize,
}

/// A palette drop waiting for its template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInsertion {
    pub template_ref: String,
    pub target: DropTarget,
}

/// Outcome of releasing the pointer over a slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropIntent {
    /// Needs an asynchronous template load before it can be applied
    Insert(PendingInsertion),
    /// Can be applied right away
    Move { block_id: BlockId, target: DropTarget },
}

impl DropIntent {
    /// The synchronous mutation for a move; `None` for palette inserts
    pub fn to_mutation(&self) -> Option<Mutation> {
        match self {
            DropIntent::Move { block_id, target } => Some(Mutation::MoveBlock {
                block_id: *block_id,
                target: target.slot.clone(),
                index: target.index,
            }),
            DropIntent::Insert(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Gesture {
    source: DragSource,
    target: Option<DropTarget>,
}

/// Tracks the drag gesture in progress, if any
#[derive(Debug, Default)]
pub struct DragController {
    gesture: Option<Gesture>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start dragging a template out of the palette
    pub fn begin_palette(&mut self, template_ref: impl Into<String>) {
        self.begin(DragSource::Palette {
            template_ref: template_ref.into(),
        });
    }

    /// Start dragging a block already on the canvas
    pub fn begin_move(&mut self, block_id: BlockId) {
        self.begin(DragSource::Existing { block_id });
    }

    fn begin(&mut self, source: DragSource) {
        self.gesture = Some(Gesture {
            source,
            target: None,
        });
    }

    pub fn is_dragging(&self) -> bool {
        self.gesture.is_some()
    }

    pub fn source(&self) -> Option<&DragSource> {
        self.gesture.as_ref().map(|g| &g.source)
    }

    pub fn target(&self) -> Option<&DropTarget> {
        self.gesture.as_ref().and_then(|g| g.target.as_ref())
    }

    /// Pointer moved over a slot; recompute the insertion point
    pub fn hover(&mut self, layout: &SlotLayout, pointer_y: f64) -> Option<&DropTarget> {
        let gesture = self.gesture.as_mut()?;
        let exclude = match &gesture.source {
            DragSource::Existing { block_id } => Some(*block_id),
            DragSource::Palette { .. } => None,
        };
        let index = insertion_index(pointer_y, &layout.siblings, exclude);
        gesture.target = Some(DropTarget {
            slot: layout.slot.clone(),
            index,
        });
        gesture.target.as_ref()
    }

    /// Pointer left every slot
    pub fn leave(&mut self) {
        if let Some(gesture) = self.gesture.as_mut() {
            gesture.target = None;
        }
    }

    /// Finish the gesture. `None` if nothing was being dragged or the
    /// pointer was not over a slot.
    pub fn release(&mut self) -> Option<DropIntent> {
        let gesture = self.gesture.take()?;
        let target = gesture.target?;
        Some(match gesture.source {
            DragSource::Palette { template_ref } => DropIntent::Insert(PendingInsertion {
                template_ref,
                target,
            }),
            DragSource::Existing { block_id } => DropIntent::Move { block_id, target },
        })
    }

    pub fn cancel(&mut self) {
        self.gesture = None;
    }
}
