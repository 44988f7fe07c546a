//! # Pagecraft Editor
//!
//! Core canvas editing engine for Pagecraft.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ markup: template text → PreparedTemplate    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: Canvas tree + mutations             │
//! │  - Insert/move/remove/duplicate blocks      │
//! │  - Apply settings, re-render markup         │
//! │  - Snapshot history (undo/redo)             │
//! │  - Portable schema out                      │
//! │  - Drag & drop insertion points             │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ workspace: template loading, schema in,     │
//! │ history recording, autosave                 │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The block tree is the source of truth**: markup is a derived view
//! 2. **Containment defines structure**: no parent pointers, no DOM walks
//! 3. **Every edit is a mutation**: the canvas publishes each one as a
//!    [`CanvasChange`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pagecraft_editor::{render_canvas, BlockInstance, Canvas, Mutation, SlotRef};
//!
//! let mut canvas = Canvas::new();
//! let id = canvas.ids().next_id();
//! let block = BlockInstance::from_template(id, &template, None);
//!
//! canvas.apply(Mutation::InsertBlock {
//!     slot: SlotRef::root(),
//!     index: 0,
//!     block,
//! })?;
//!
//! let html = render_canvas(&canvas);
//! let schema = pagecraft_editor::serialize(&canvas).to_json()?;
//! ```

mod block;
mod canvas;
mod changes;
mod drag;
mod errors;
mod history;
mod mutations;
mod renderer;
mod schema;
mod state;

pub use block::{BlockId, BlockInstance, DropArea, IdAllocator, SlotRef};
pub use canvas::{Canvas, CanvasSnapshot, MutationResult, ROOT_AREA};
pub use changes::{CanvasChange, ChangeFeed, ChangeKind, ChangeOrigin};
pub use drag::{
    insertion_index, DragController, DragSource, DropIntent, DropTarget, PendingInsertion,
    SiblingBox, SlotLayout,
};
pub use errors::EditorError;
pub use history::{History, DEFAULT_MAX_LEVELS};
pub use mutations::{Mutation, MutationError};
pub use renderer::{render_area, render_block, render_canvas, render_own};
pub use schema::{serialize, serialize_block, BlockSchema, PageSchema, SchemaError, SCHEMA_VERSION};
pub use state::BlockStateStore;

// Re-export markup types that appear in this crate's API
pub use pagecraft_markup::{PreparedTemplate, Settings};
