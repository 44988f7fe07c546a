//! # Block instances
//!
//! The canvas is an explicit recursive tree: a [`BlockInstance`] owns its
//! drop areas, each area owns its child blocks. Nodes never point back at
//! their parent; containment alone defines structure.

use pagecraft_markup::{PreparedTemplate, Settings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-unique block identifier
pub type BlockId = u64;

/// One node of the canvas tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInstance {
    pub id: BlockId,

    /// Template this block was instantiated from
    pub template_ref: String,

    /// Sanitized template body without its settings-schema fragment.
    /// Every render substitutes into this.
    pub original_markup: String,

    pub settings: Settings,

    /// Named drop areas, in template order
    pub areas: Vec<DropArea>,
}

/// A named, ordered list of child blocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropArea {
    pub name: String,
    pub blocks: Vec<BlockInstance>,
}

impl DropArea {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl BlockInstance {
    /// Instantiate a template. `settings` of `None` means the schema defaults.
    pub fn from_template(id: BlockId, template: &PreparedTemplate, settings: Option<Settings>) -> Self {
        Self {
            id,
            template_ref: template.template_ref.clone(),
            original_markup: template.cleaned_markup.clone(),
            settings: settings.unwrap_or_else(|| template.schema.defaults()),
            areas: template.areas.iter().map(DropArea::new).collect(),
        }
    }

    pub fn area(&self, name: &str) -> Option<&DropArea> {
        self.areas.iter().find(|a| a.name == name)
    }

    pub fn area_mut(&mut self, name: &str) -> Option<&mut DropArea> {
        self.areas.iter_mut().find(|a| a.name == name)
    }

    /// Whether `id` is this block or nested anywhere below it
    pub fn contains(&self, id: BlockId) -> bool {
        self.id == id
            || self
                .areas
                .iter()
                .any(|area| area.blocks.iter().any(|b| b.contains(id)))
    }

    /// Number of blocks in this subtree, itself included
    pub fn subtree_len(&self) -> usize {
        1 + self
            .areas
            .iter()
            .flat_map(|a| a.blocks.iter())
            .map(BlockInstance::subtree_len)
            .sum::<usize>()
    }

    /// Largest id in this subtree
    pub fn max_id(&self) -> BlockId {
        self.areas
            .iter()
            .flat_map(|a| a.blocks.iter())
            .map(BlockInstance::max_id)
            .fold(self.id, BlockId::max)
    }

    /// Depth-first, pre-order walk over this subtree
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a BlockInstance)) {
        visit(self);
        for area in &self.areas {
            for child in &area.blocks {
                child.walk(visit);
            }
        }
    }

    /// Give this block and all descendants fresh ids, pre-order
    pub fn reassign_ids(&mut self, ids: &IdAllocator) {
        self.id = ids.next_id();
        for area in &mut self.areas {
            for child in &mut area.blocks {
                child.reassign_ids(ids);
            }
        }
    }
}

/// Identity of a drop slot: an area of a block, or the canvas root
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRef {
    /// Owning block, `None` for the canvas root
    pub owner: Option<BlockId>,
    pub area: String,
}

impl SlotRef {
    pub fn root() -> Self {
        Self {
            owner: None,
            area: crate::canvas::ROOT_AREA.to_string(),
        }
    }

    pub fn area(owner: BlockId, area: impl Into<String>) -> Self {
        Self {
            owner: Some(owner),
            area: area.into(),
        }
    }
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.owner {
            Some(owner) => write!(f, "{}#{}", owner, self.area),
            None => write!(f, "canvas#{}", self.area),
        }
    }
}

/// Shared, monotonically increasing id source.
///
/// Clones hand out ids from the same sequence. Ids seen on restored
/// content are fed back through [`IdAllocator::observe`] so later
/// allocations never collide with them.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: Arc<AtomicU64>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: BlockId) -> Self {
        Self {
            next: Arc::new(AtomicU64::new(first)),
        }
    }

    pub fn next_id(&self) -> BlockId {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Make sure future ids are greater than `id`
    pub fn observe(&self, id: BlockId) {
        self.next.fetch_max(id.saturating_add(1), Ordering::Relaxed);
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
