//! Template sources.
//!
//! The cache only knows the [`TemplateFetcher`] trait. A directory of
//! `.html` files is the production source; [`StaticFetcher`] keeps
//! templates in memory for tests and embedding.

use crate::errors::FetchError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

/// Loads raw template markup by reference
#[async_trait]
pub trait TemplateFetcher: Send + Sync {
    async fn fetch(&self, template_ref: &str) -> Result<String, FetchError>;
}

/// Check that a template reference is a plain relative name.
///
/// Accepted: `/`-separated segments of ASCII letters, digits, `-`, `_`
/// and `.`, where no segment is empty, `.` or `..`.
pub fn validate_template_ref(template_ref: &str) -> Result<(), FetchError> {
    let invalid = || FetchError::InvalidRef(template_ref.to_string());

    if template_ref.is_empty() {
        return Err(invalid());
    }
    for segment in template_ref.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(invalid());
        }
        let ok = segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !ok {
            return Err(invalid());
        }
    }
    Ok(())
}

/// Reads `<root>/<template_ref>.html`
#[derive(Debug, Clone)]
pub struct DirectoryFetcher {
    root: PathBuf,
}

impl DirectoryFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File a template reference resolves to
    pub fn path_for(&self, template_ref: &str) -> Result<PathBuf, FetchError> {
        validate_template_ref(template_ref)?;
        Ok(self.root.join(format!("{}.html", template_ref)))
    }
}

#[async_trait]
impl TemplateFetcher for DirectoryFetcher {
    async fn fetch(&self, template_ref: &str) -> Result<String, FetchError> {
        let path = self.path_for(template_ref)?;
        tracing::debug!(template = %template_ref, path = %path.display(), "reading template");

        tokio::fs::read_to_string(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FetchError::NotFound(template_ref.to_string()),
            _ => FetchError::Failed {
                template_ref: template_ref.to_string(),
                message: e.to_string(),
            },
        })
    }
}

/// In-memory template source that counts its fetches
#[derive(Debug, Default)]
pub struct StaticFetcher {
    templates: RwLock<HashMap<String, String>>,
    fetches: AtomicUsize,
    latency: Option<Duration>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(self, template_ref: &str, markup: &str) -> Self {
        self.insert(template_ref, markup);
        self
    }

    /// Make every fetch take `latency` before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn insert(&self, template_ref: &str, markup: &str) {
        self.templates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(template_ref.to_string(), markup.to_string());
    }

    pub fn remove(&self, template_ref: &str) {
        self.templates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(template_ref);
    }

    /// Number of fetches served so far, failed ones included
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TemplateFetcher for StaticFetcher {
    async fn fetch(&self, template_ref: &str) -> Result<String, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(template_ref)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(template_ref.to_string()))
    }
}
