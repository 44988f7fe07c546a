//! # Schema → canvas
//!
//! Rebuilds a block tree from a [`PageSchema`]:
//!
//! 1. Each node's template is loaded before its children are built
//! 2. Siblings load concurrently (the cache coalesces repeated refs)
//! 3. Ids are assigned depth-first once the whole tree exists
//! 4. The finished tree replaces the canvas in one step and the block
//!    state store is rebuilt
//!
//! A template that cannot be loaded is handled by
//! [`MissingTemplatePolicy`].

use crate::cache::TemplateCache;
use crate::errors::{DeserializeError, LoadError};
use crate::lock;
use futures::future::{join_all, BoxFuture, FutureExt};
use pagecraft_editor::{BlockInstance, BlockSchema, BlockStateStore, Canvas, PageSchema};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// What to do with a node whose template fails to load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingTemplatePolicy {
    /// Drop the node and its subtree, report it, keep going
    #[default]
    Skip,
    /// Fail the whole load; the canvas is left as it was
    Abort,
}

/// A node left out of the rebuilt tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBlock {
    pub template_ref: String,
    /// Nodes dropped with it, itself included
    pub subtree_len: usize,
    pub error: LoadError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeserializeReport {
    /// Blocks now on the canvas
    pub blocks: usize,
    pub skipped: Vec<SkippedBlock>,
}

struct BuiltNode {
    block: Option<BlockInstance>,
    skipped: Vec<SkippedBlock>,
}

pub struct Deserializer {
    cache: TemplateCache,
    policy: MissingTemplatePolicy,
}

impl Deserializer {
    pub fn new(cache: TemplateCache) -> Self {
        Self::with_policy(cache, MissingTemplatePolicy::default())
    }

    pub fn with_policy(cache: TemplateCache, policy: MissingTemplatePolicy) -> Self {
        Self { cache, policy }
    }

    pub fn policy(&self) -> MissingTemplatePolicy {
        self.policy
    }

    /// Build the tree described by `schema` and swap it into `canvas`
    pub async fn deserialize(
        &self,
        schema: &PageSchema,
        canvas: &Mutex<Canvas>,
        state: &BlockStateStore,
    ) -> Result<DeserializeReport, DeserializeError> {
        let (mut blocks, skipped) = self.build(schema).await?;

        let mut canvas = lock(canvas);
        for block in &mut blocks {
            block.reassign_ids(canvas.ids());
        }
        canvas.replace(blocks);
        state.rebuild();

        let report = DeserializeReport {
            blocks: canvas.block_count(),
            skipped,
        };
        tracing::info!(
            blocks = report.blocks,
            skipped = report.skipped.len(),
            "loaded page schema"
        );
        Ok(report)
    }

    /// Build the top-level blocks without touching any canvas. Ids are
    /// left at zero.
    pub async fn build(
        &self,
        schema: &PageSchema,
    ) -> Result<(Vec<BlockInstance>, Vec<SkippedBlock>), DeserializeError> {
        schema.check_version()?;
        let (blocks, skipped) = self.build_siblings(&schema.blocks).await?;
        Ok((blocks, skipped))
    }

    async fn build_siblings(
        &self,
        nodes: &[BlockSchema],
    ) -> Result<(Vec<BlockInstance>, Vec<SkippedBlock>), LoadError> {
        let built = join_all(nodes.iter().map(|node| self.build_node(node))).await;

        let mut blocks = Vec::with_capacity(nodes.len());
        let mut skipped = Vec::new();
        for node in built {
            let node = node?;
            blocks.extend(node.block);
            skipped.extend(node.skipped);
        }
        Ok((blocks, skipped))
    }

    fn build_node<'a>(&'a self, node: &'a BlockSchema) -> BoxFuture<'a, Result<BuiltNode, LoadError>> {
        async move {
            let cached = match self.cache.load(&node.template).await {
                Ok(cached) => cached,
                Err(error) => {
                    return match self.policy {
                        MissingTemplatePolicy::Abort => Err(error),
                        MissingTemplatePolicy::Skip => {
                            tracing::warn!(
                                template = %node.template,
                                error = %error,
                                "skipping block with unloadable template"
                            );
                            Ok(BuiltNode {
                                block: None,
                                skipped: vec![SkippedBlock {
                                    template_ref: node.template.clone(),
                                    subtree_len: node.subtree_len(),
                                    error,
                                }],
                            })
                        }
                    };
                }
            };

            let mut block = BlockInstance::from_template(0, &cached.template, Some(node.settings.clone()));
            if node.areas.len() > block.areas.len() {
                tracing::warn!(
                    template = %node.template,
                    declared = block.areas.len(),
                    found = node.areas.len(),
                    "schema has more areas than the template, extra areas dropped"
                );
            }

            let mut skipped = Vec::new();
            let children = join_all(
                node.areas
                    .iter()
                    .take(block.areas.len())
                    .map(|area| self.build_siblings(area)),
            )
            .await;
            for (area, built) in block.areas.iter_mut().zip(children) {
                let (blocks, area_skipped) = built?;
                area.blocks = blocks;
                skipped.extend(area_skipped);
            }

            Ok(BuiltNode {
                block: Some(block),
                skipped,
            })
        }
        .boxed()
    }
}
