//! # Autosave and draft reconciliation
//!
//! ```text
//! note_edit ─┬─ local draft (awaited)
//!            ├─ remote draft (spawned after the previous one, failures logged)
//!            └─ (re)arm debounce ──→ fires if no newer edit
//!                                      ↓
//!                     link checks (warnings only) → final save, stamped
//!                                      ↓ ok
//!                     wait for the pending remote draft,
//!                     clear drafts if still latest
//! ```
//!
//! The save stamp is stored with the page, so a later session reconciles
//! drafts against it instead of restoring work that was already saved.
//!
//! Draft-store failures are logged and swallowed: the other draft and the
//! in-memory tree still hold the edit. A failed final save is reported as
//! [`AutosaveEvent::SaveFailed`] and returned from [`Autosaver::save_now`].

use crate::drafts::{Draft, LocalDraftStore, PageContent, RemoteStore, SavedPage};
use crate::errors::AutosaveError;
use crate::lock;
use crate::reachability::{check_markup, LinkWarning, ReachabilityChecker};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Default delay between the last edit and the final save
pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_millis(2000);

/// Unix milliseconds, the clock drafts and saves are stamped with
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutosaveEvent {
    Saved { timestamp: i64 },
    /// Non-blocking: the save went ahead anyway
    Warning(Vec<LinkWarning>),
    /// Blocking: the page was not saved
    SaveFailed(String),
}

/// Where a reconciled draft came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftSource {
    Local,
    Remote,
}

/// Pick the draft to restore: the newest one newer than the saved state.
/// On equal timestamps the local draft wins.
pub fn reconcile(
    local: Option<&Draft>,
    remote: Option<&Draft>,
    last_saved: Option<i64>,
) -> Option<(DraftSource, Draft)> {
    let is_fresh = |draft: &&Draft| last_saved.map_or(true, |saved| draft.timestamp > saved);
    let local = local.filter(is_fresh);
    let remote = remote.filter(is_fresh);

    match (local, remote) {
        (Some(l), Some(r)) if r.timestamp > l.timestamp => Some((DraftSource::Remote, r.clone())),
        (Some(l), _) => Some((DraftSource::Local, l.clone())),
        (None, Some(r)) => Some((DraftSource::Remote, r.clone())),
        (None, None) => None,
    }
}

#[derive(Debug, Clone)]
pub struct AutosaveOptions {
    pub debounce: Duration,
    pub check_links: bool,
}

impl Default for AutosaveOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_SAVE_DEBOUNCE,
            check_links: true,
        }
    }
}

struct AutosaveInner {
    page_id: String,
    local: Arc<dyn LocalDraftStore>,
    remote: Arc<dyn RemoteStore>,
    checker: Option<Arc<dyn ReachabilityChecker>>,
    options: AutosaveOptions,
    /// Bumped on every edit; a debounce only fires for its own generation
    generation: AtomicU64,
    latest: Mutex<Option<PageContent>>,
    last_saved: Mutex<Option<i64>>,
    /// The most recent remote draft write, each one chained after the last
    remote_draft: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<AutosaveEvent>,
}

/// Cloneable handle; clones share state and timers
#[derive(Clone)]
pub struct Autosaver {
    inner: Arc<AutosaveInner>,
}

impl Autosaver {
    pub fn new(
        page_id: impl Into<String>,
        local: Arc<dyn LocalDraftStore>,
        remote: Arc<dyn RemoteStore>,
        options: AutosaveOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(AutosaveInner {
                page_id: page_id.into(),
                local,
                remote,
                checker: None,
                options,
                generation: AtomicU64::new(0),
                latest: Mutex::new(None),
                last_saved: Mutex::new(None),
                remote_draft: Mutex::new(None),
                events,
            }),
        }
    }

    /// Attach a pre-save link checker. Must be called before the handle is cloned.
    pub fn with_checker(mut self, checker: Arc<dyn ReachabilityChecker>) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.checker = Some(checker),
            None => tracing::warn!("autosaver already shared, link checker ignored"),
        }
        self
    }

    pub fn page_id(&self) -> &str {
        &self.inner.page_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AutosaveEvent> {
        self.inner.events.subscribe()
    }

    pub fn last_saved(&self) -> Option<i64> {
        *lock(&self.inner.last_saved)
    }

    /// Seed the saved-state timestamp, e.g. from page metadata
    pub fn set_last_saved(&self, timestamp: Option<i64>) {
        *lock(&self.inner.last_saved) = timestamp;
    }

    /// Whether an edit has not reached the final save yet
    pub fn is_dirty(&self) -> bool {
        lock(&self.inner.latest).is_some()
    }

    /// Capture an edit: write both drafts and re-arm the save debounce
    pub async fn note_edit(&self, page: PageContent) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let draft = Draft {
            content: page.schema_json.clone(),
            timestamp: now_millis(),
        };
        *lock(&self.inner.latest) = Some(page);

        if let Err(e) = self.inner.local.save(&self.inner.page_id, &draft).await {
            tracing::warn!(page = %self.inner.page_id, error = %e, "failed to write local draft");
        }

        {
            let inner = Arc::clone(&self.inner);
            let mut pending = lock(&self.inner.remote_draft);
            let previous = pending.take();
            *pending = Some(tokio::spawn(async move {
                if let Some(previous) = previous {
                    let _ = previous.await;
                }
                if let Err(e) = inner.remote.save_draft(&inner.page_id, &draft).await {
                    tracing::warn!(page = %inner.page_id, error = %e, "failed to write remote draft");
                }
            }));
        }

        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.inner.options.debounce).await;
            if this.inner.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            // Failures are already reported on the event channel
            let _ = this.save(generation).await;
        });
    }

    /// Run the final save now, without waiting for the debounce
    pub async fn save_now(&self) -> Result<i64, AutosaveError> {
        let generation = self.inner.generation.load(Ordering::SeqCst);
        self.save(generation).await
    }

    async fn save(&self, generation: u64) -> Result<i64, AutosaveError> {
        let inner = &self.inner;
        let page = lock(&inner.latest).clone().ok_or(AutosaveError::NothingToSave)?;

        if inner.options.check_links {
            if let Some(checker) = &inner.checker {
                let warnings = check_markup(checker.as_ref(), &page.markup).await;
                if !warnings.is_empty() {
                    self.emit(AutosaveEvent::Warning(warnings));
                }
            }
        }

        let timestamp = now_millis();
        if let Err(e) = inner.remote.save_page(&inner.page_id, &page, timestamp).await {
            tracing::error!(page = %inner.page_id, error = %e, "final save failed");
            self.emit(AutosaveEvent::SaveFailed(e.to_string()));
            return Err(AutosaveError::SaveFailed(e));
        }
        *lock(&inner.last_saved) = Some(timestamp);

        // A draft write still in flight would land after the clear
        let pending = lock(&inner.remote_draft).take();
        if let Some(pending) = pending {
            let _ = pending.await;
        }

        if inner.generation.load(Ordering::SeqCst) == generation {
            *lock(&inner.latest) = None;
            self.clear_drafts(true, true).await;
        } else {
            tracing::debug!(page = %inner.page_id, "newer edit arrived during save, keeping drafts");
        }

        tracing::info!(page = %inner.page_id, timestamp, "page saved");
        self.emit(AutosaveEvent::Saved { timestamp });
        Ok(timestamp)
    }

    /// Fetch the last saved page and adopt its save stamp when it is newer
    /// than the one known here
    pub async fn saved_page(&self) -> Option<SavedPage> {
        let inner = &self.inner;
        let saved = inner.remote.load_page(&inner.page_id).await.unwrap_or_else(|e| {
            tracing::warn!(page = %inner.page_id, error = %e, "failed to read saved page");
            None
        })?;

        {
            let mut last_saved = lock(&inner.last_saved);
            if last_saved.map_or(true, |known| known < saved.saved_at) {
                *last_saved = Some(saved.saved_at);
            }
        }
        Some(saved)
    }

    /// Load both drafts, pick the one to restore and discard the others.
    /// Returns the winner, if any, for the caller to apply.
    pub async fn restore(&self) -> Option<(DraftSource, Draft)> {
        let inner = &self.inner;
        if self.last_saved().is_none() {
            self.saved_page().await;
        }
        let local = inner.local.load(&inner.page_id).await.unwrap_or_else(|e| {
            tracing::warn!(page = %inner.page_id, error = %e, "failed to read local draft");
            None
        });
        let remote = inner.remote.load_draft(&inner.page_id).await.unwrap_or_else(|e| {
            tracing::warn!(page = %inner.page_id, error = %e, "failed to read remote draft");
            None
        });

        let winner = reconcile(local.as_ref(), remote.as_ref(), self.last_saved());
        match &winner {
            Some((DraftSource::Local, draft)) => {
                tracing::info!(page = %inner.page_id, timestamp = draft.timestamp, "restoring local draft");
                self.clear_drafts(false, remote.is_some()).await;
            }
            Some((DraftSource::Remote, draft)) => {
                tracing::info!(page = %inner.page_id, timestamp = draft.timestamp, "restoring remote draft");
                self.clear_drafts(local.is_some(), false).await;
            }
            None => self.clear_drafts(local.is_some(), remote.is_some()).await,
        }
        winner
    }

    async fn clear_drafts(&self, local: bool, remote: bool) {
        let inner = &self.inner;
        if local {
            if let Err(e) = inner.local.clear(&inner.page_id).await {
                tracing::warn!(page = %inner.page_id, error = %e, "failed to clear local draft");
            }
        }
        if remote {
            if let Err(e) = inner.remote.clear_draft(&inner.page_id).await {
                tracing::warn!(page = %inner.page_id, error = %e, "failed to clear remote draft");
            }
        }
    }

    fn emit(&self, event: AutosaveEvent) {
        let _ = self.inner.events.send(event);
    }
}
