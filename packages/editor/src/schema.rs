//! # Portable schema
//!
//! Renderer-independent form of the canvas used for persistence and
//! transfer:
//!
//! ```json
//! { "version": 1,
//!   "blocks": [ { "template": "hero",
//!                 "settings": { "title": "Hi" },
//!                 "areas": [ [ ...blocks ], [ ...blocks ] ] } ] }
//! ```
//!
//! Areas are positional, in the same order as the block's drop areas.
//! Absent fields default to empty; `version` must be checked on read.

use crate::block::BlockInstance;
use crate::canvas::Canvas;
use pagecraft_markup::Settings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Schema version written by this crate
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported schema version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSchema {
    #[serde(default = "current_version")]
    pub version: u32,

    #[serde(default)]
    pub blocks: Vec<BlockSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSchema {
    #[serde(default)]
    pub template: String,

    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub areas: Vec<Vec<BlockSchema>>,
}

fn current_version() -> u32 {
    SCHEMA_VERSION
}

impl Default for PageSchema {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            blocks: Vec::new(),
        }
    }
}

impl PageSchema {
    /// Parse and version-check a schema document
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let schema: PageSchema = serde_json::from_str(json)?;
        schema.check_version()?;
        Ok(schema)
    }

    pub fn to_json(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn check_version(&self) -> Result<(), SchemaError> {
        if self.version == SCHEMA_VERSION {
            Ok(())
        } else {
            Err(SchemaError::UnsupportedVersion {
                found: self.version,
                supported: SCHEMA_VERSION,
            })
        }
    }

    /// Number of blocks described, nested ones included
    pub fn block_count(&self) -> usize {
        self.blocks.iter().map(BlockSchema::subtree_len).sum()
    }
}

impl BlockSchema {
    pub fn subtree_len(&self) -> usize {
        1 + self
            .areas
            .iter()
            .flatten()
            .map(BlockSchema::subtree_len)
            .sum::<usize>()
    }
}

/// Serialize the canvas, depth first
pub fn serialize(canvas: &Canvas) -> PageSchema {
    PageSchema {
        version: SCHEMA_VERSION,
        blocks: canvas.blocks().iter().map(serialize_block).collect(),
    }
}

pub fn serialize_block(block: &BlockInstance) -> BlockSchema {
    BlockSchema {
        template: block.template_ref.clone(),
        settings: block.settings.clone(),
        areas: block
            .areas
            .iter()
            .map(|area| area.blocks.iter().map(serialize_block).collect())
            .collect(),
    }
}
