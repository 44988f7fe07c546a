//! # Pagecraft Workspace
//!
//! Asynchronous services around the editing engine:
//!
//! - [`TemplateCache`]: coalesced, expiring template loads
//! - [`complete_insertion`]: palette drops that finish once a template arrives
//! - [`Deserializer`]: portable schema back into a live canvas
//! - [`HistoryRecorder`]: quiescence-debounced undo snapshots
//! - [`Autosaver`]: local + remote drafts, debounced final save, draft
//!   reconciliation on load
//! - [`EditorSession`]: all of the above behind one handle
//!
//! Shared state sits behind `std::sync` locks that are never held across
//! an `.await`.

mod autosave;
mod cache;
mod config;
mod deserializer;
mod drafts;
mod errors;
mod fetcher;
mod insertion;
mod reachability;
mod recorder;
mod session;

pub use autosave::{
    now_millis, reconcile, AutosaveEvent, AutosaveOptions, Autosaver, DraftSource,
    DEFAULT_SAVE_DEBOUNCE,
};
pub use cache::{CachedTemplate, TemplateCache, DEFAULT_TTL};
pub use config::{EditorConfig, DEFAULT_CONFIG_NAME};
pub use deserializer::{DeserializeReport, Deserializer, MissingTemplatePolicy, SkippedBlock};
pub use drafts::{
    Draft, FileDraftStore, LocalDraftStore, MemoryDraftStore, MemoryRemoteStore, PageContent,
    RemoteStore, SavedPage,
};
pub use errors::{
    AutosaveError, ConfigError, DeserializeError, FetchError, LoadError, SessionError, StoreError,
};
pub use fetcher::{validate_template_ref, DirectoryFetcher, StaticFetcher, TemplateFetcher};
pub use insertion::{complete_insertion, InsertionOutcome};
pub use reachability::{check_markup, AssetChecker, LinkWarning, Reachability, ReachabilityChecker};
pub use recorder::{record_if_changed, HistoryRecorder, DEFAULT_QUIESCENCE};
pub use session::{EditorSession, ReleaseOutcome, SessionOptions};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
