//! Draft and page stores used by the autosaver.
//!
//! A draft is the latest unsaved content of a page plus the time it was
//! captured. Drafts live in two places: a local store that is written on
//! every edit, and the remote store that also receives the final save.

use crate::errors::StoreError;
use crate::lock;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Unsaved page content with its capture time (Unix milliseconds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub content: String,
    pub timestamp: i64,
}

/// What the final save sends
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContent {
    /// Portable schema JSON, the form drafts are kept in
    pub schema_json: String,
    /// Rendered page markup
    pub markup: String,
}

/// The last final save of a page and when it happened (Unix milliseconds)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPage {
    pub content: PageContent,
    pub saved_at: i64,
}

#[async_trait]
pub trait LocalDraftStore: Send + Sync {
    async fn save(&self, page_id: &str, draft: &Draft) -> Result<(), StoreError>;
    async fn load(&self, page_id: &str) -> Result<Option<Draft>, StoreError>;
    async fn clear(&self, page_id: &str) -> Result<(), StoreError>;
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn save_draft(&self, page_id: &str, draft: &Draft) -> Result<(), StoreError>;
    async fn load_draft(&self, page_id: &str) -> Result<Option<Draft>, StoreError>;
    async fn clear_draft(&self, page_id: &str) -> Result<(), StoreError>;
    async fn save_page(&self, page_id: &str, page: &PageContent, saved_at: i64) -> Result<(), StoreError>;
    async fn load_page(&self, page_id: &str) -> Result<Option<SavedPage>, StoreError>;
}

/// One JSON file per page: `<dir>/<page_id>.draft.json`
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, page_id: &str) -> PathBuf {
        // Anything outside [A-Za-z0-9_-] would be a path hazard
        let file_stem: String = page_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.draft.json", file_stem))
    }
}

#[async_trait]
impl LocalDraftStore for FileDraftStore {
    async fn save(&self, page_id: &str, draft: &Draft) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string(draft)?;
        tokio::fs::write(self.path_for(page_id), json).await?;
        Ok(())
    }

    async fn load(&self, page_id: &str) -> Result<Option<Draft>, StoreError> {
        match tokio::fs::read_to_string(self.path_for(page_id)).await {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self, page_id: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(page_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Local draft store kept in memory
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    drafts: Mutex<HashMap<String, Draft>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, page_id: &str) -> Option<Draft> {
        lock(&self.drafts).get(page_id).cloned()
    }
}

#[async_trait]
impl LocalDraftStore for MemoryDraftStore {
    async fn save(&self, page_id: &str, draft: &Draft) -> Result<(), StoreError> {
        lock(&self.drafts).insert(page_id.to_string(), draft.clone());
        Ok(())
    }

    async fn load(&self, page_id: &str) -> Result<Option<Draft>, StoreError> {
        Ok(self.get(page_id))
    }

    async fn clear(&self, page_id: &str) -> Result<(), StoreError> {
        lock(&self.drafts).remove(page_id);
        Ok(())
    }
}

/// Remote store kept in memory, with a switch to make final saves fail
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    drafts: Mutex<HashMap<String, Draft>>,
    pages: Mutex<HashMap<String, SavedPage>>,
    saves: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `save_page` fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn draft(&self, page_id: &str) -> Option<Draft> {
        lock(&self.drafts).get(page_id).cloned()
    }

    pub fn page(&self, page_id: &str) -> Option<PageContent> {
        lock(&self.pages).get(page_id).map(|saved| saved.content.clone())
    }

    /// Number of successful final saves
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn save_draft(&self, page_id: &str, draft: &Draft) -> Result<(), StoreError> {
        lock(&self.drafts).insert(page_id.to_string(), draft.clone());
        Ok(())
    }

    async fn load_draft(&self, page_id: &str) -> Result<Option<Draft>, StoreError> {
        Ok(self.draft(page_id))
    }

    async fn clear_draft(&self, page_id: &str) -> Result<(), StoreError> {
        lock(&self.drafts).remove(page_id);
        Ok(())
    }

    async fn save_page(&self, page_id: &str, page: &PageContent, saved_at: i64) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Remote("service unavailable".to_string()));
        }
        let saved = SavedPage {
            content: page.clone(),
            saved_at,
        };
        lock(&self.pages).insert(page_id.to_string(), saved);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_page(&self, page_id: &str) -> Result<Option<SavedPage>, StoreError> {
        Ok(lock(&self.pages).get(page_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDraftStore::new(dir.path().join("drafts"));
        let draft = Draft {
            content: r#"{"version":1,"blocks":[]}"#.to_string(),
            timestamp: 1234,
        };

        assert_eq!(store.load("home").await.unwrap(), None);
        store.save("home", &draft).await.unwrap();
        assert_eq!(store.load("home").await.unwrap(), Some(draft));

        store.clear("home").await.unwrap();
        assert_eq!(store.load("home").await.unwrap(), None);
        // Clearing twice is fine
        store.clear("home").await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_keeps_page_ids_inside_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDraftStore::new(dir.path());
        let draft = Draft {
            content: String::new(),
            timestamp: 1,
        };

        store.save("../escape", &draft).await.unwrap();

        assert!(dir.path().join("___escape.draft.json").exists());
    }

    #[tokio::test]
    async fn test_corrupt_draft_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("home.draft.json"), "not json").unwrap();
        let store = FileDraftStore::new(dir.path());

        assert!(matches!(store.load("home").await, Err(StoreError::Json(_))));
    }

    #[tokio::test]
    async fn test_memory_remote_failing_switch() {
        let remote = MemoryRemoteStore::new();
        let page = PageContent::default();

        remote.set_failing(true);
        assert!(remote.save_page("home", &page, 10).await.is_err());
        assert_eq!(remote.load_page("home").await.unwrap(), None);
        remote.set_failing(false);
        remote.save_page("home", &page, 20).await.unwrap();

        assert_eq!(remote.save_count(), 1);
        assert_eq!(remote.page("home"), Some(page.clone()));
        let saved = remote.load_page("home").await.unwrap().unwrap();
        assert_eq!(saved.saved_at, 20);
        assert_eq!(saved.content, page);
    }
}
