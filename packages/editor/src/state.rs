//! Block State Store: block id → settings dictionary.
//!
//! Populated lazily, the first time a block's settings are asked for.
//! Entries of deleted blocks are never reclaimed one by one; they simply
//! become unreachable and disappear when the store is rebuilt after the
//! next deserialization.

use crate::block::BlockId;
use pagecraft_markup::Settings;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Shared handle; clones see the same map
#[derive(Debug, Clone, Default)]
pub struct BlockStateStore {
    entries: Arc<RwLock<HashMap<BlockId, Settings>>>,
}

impl BlockStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings for `id`, computing and storing them with `init` on first use
    pub fn get_or_init<F>(&self, id: BlockId, init: F) -> Settings
    where
        F: FnOnce() -> Settings,
    {
        if let Some(settings) = self.get(id) {
            return settings;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.entry(id).or_insert_with(init).clone()
    }

    pub fn get(&self, id: BlockId) -> Option<Settings> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    pub fn set(&self, id: BlockId, settings: Settings) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, settings);
    }

    /// Change one value of an existing entry. Returns the updated
    /// dictionary, or `None` if the block has no entry yet.
    pub fn update(&self, id: BlockId, key: &str, value: &str) -> Option<Settings> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let settings = entries.get_mut(&id)?;
        settings.insert(key.to_string(), value.to_string());
        Some(settings.clone())
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    /// Forget every entry
    pub fn rebuild(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
