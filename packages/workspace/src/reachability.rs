//! Pre-save link and asset checks.
//!
//! Unreachable targets only ever produce warnings; they never block a
//! save.

use async_trait::async_trait;
use pagecraft_markup::extract_urls;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    Reachable,
    Unreachable(String),
    /// Not something this checker can verify
    Skipped,
}

#[async_trait]
pub trait ReachabilityChecker: Send + Sync {
    async fn check(&self, url: &str) -> Reachability;
}

/// A link or asset that failed its check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkWarning {
    pub url: String,
    pub reason: String,
}

/// Check every link and asset target in `markup`
pub async fn check_markup(checker: &dyn ReachabilityChecker, markup: &str) -> Vec<LinkWarning> {
    let mut warnings = Vec::new();
    for url in extract_urls(markup) {
        match checker.check(&url).await {
            Reachability::Reachable => {}
            Reachability::Skipped => tracing::debug!(url = %url, "reachability check skipped"),
            Reachability::Unreachable(reason) => {
                tracing::warn!(url = %url, reason = %reason, "unreachable link");
                warnings.push(LinkWarning { url, reason });
            }
        }
    }
    warnings
}

/// Verifies that relative targets exist as files under an asset root.
/// Absolute URLs (any scheme, or `//host`) are skipped.
#[derive(Debug, Clone)]
pub struct AssetChecker {
    root: PathBuf,
}

impl AssetChecker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn has_scheme(url: &str) -> bool {
    match url.find(':') {
        Some(colon) => !url[..colon].contains(['/', '?', '#']),
        None => false,
    }
}

#[async_trait]
impl ReachabilityChecker for AssetChecker {
    async fn check(&self, url: &str) -> Reachability {
        if url.starts_with('#') {
            return Reachability::Reachable;
        }
        if url.starts_with("//") || has_scheme(url) {
            return Reachability::Skipped;
        }

        let path = url.split(['?', '#']).next().unwrap_or_default();
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Reachability::Unreachable("points outside the asset root".to_string());
        }

        match tokio::fs::metadata(self.root.join(relative)).await {
            Ok(_) => Reachability::Reachable,
            Err(e) => Reachability::Unreachable(e.to_string()),
        }
    }
}
