//! # Template Cache
//!
//! Session-scoped cache of prepared templates.
//!
//! ```text
//! load(ref) ─┬─ Ready, not expired ──────────────→ hit
//!            ├─ Pending ──→ await the shared fetch (coalesced)
//!            └─ absent/expired ─→ fetch → prepare → Ready(expires_at)
//!                                     ↘ error → evict, propagate
//! ```
//!
//! At most one fetch per template reference is in flight. Every caller
//! that arrives while it runs awaits the same [`Shared`] future and sees
//! the same result, success or failure. Each pending slot carries the
//! generation of the fetch that owns it, so a fetch outliving an
//! [`TemplateCache::invalidate`] never fills or evicts a newer slot.

use crate::errors::LoadError;
use crate::fetcher::TemplateFetcher;
use crate::lock;
use futures::future::{BoxFuture, FutureExt, Shared};
use pagecraft_markup::{prepare_template, PreparedTemplate, Sanitizer};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Default time-to-live of a cache entry
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// A prepared template and the moment it goes stale
#[derive(Debug)]
pub struct CachedTemplate {
    pub template: PreparedTemplate,
    pub expires_at: Instant,
}

impl CachedTemplate {
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

type LoadResult = Result<Arc<CachedTemplate>, LoadError>;
type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;

enum Slot {
    Ready(Arc<CachedTemplate>),
    Pending { generation: u64, load: SharedLoad },
}

struct CacheInner {
    fetcher: Arc<dyn TemplateFetcher>,
    sanitizer: Sanitizer,
    ttl: Duration,
    entries: Mutex<HashMap<String, Slot>>,
    generations: AtomicU64,
}

impl CacheInner {
    fn entries(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        lock(&self.entries)
    }
}

/// Whether `template_ref` is still waiting on the fetch of `generation`
fn owns_slot(entries: &HashMap<String, Slot>, template_ref: &str, generation: u64) -> bool {
    matches!(
        entries.get(template_ref),
        Some(Slot::Pending { generation: current, .. }) if *current == generation
    )
}

/// Cloneable handle; clones share entries and in-flight fetches
#[derive(Clone)]
pub struct TemplateCache {
    inner: Arc<CacheInner>,
}

impl TemplateCache {
    pub fn new(fetcher: Arc<dyn TemplateFetcher>, ttl: Duration) -> Self {
        Self::with_sanitizer(fetcher, ttl, Sanitizer::default())
    }

    pub fn with_sanitizer(fetcher: Arc<dyn TemplateFetcher>, ttl: Duration, sanitizer: Sanitizer) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                fetcher,
                sanitizer,
                ttl,
                entries: Mutex::new(HashMap::new()),
                generations: AtomicU64::new(0),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Load a template, from cache when possible
    pub async fn load(&self, template_ref: &str) -> Result<Arc<CachedTemplate>, LoadError> {
        let pending = {
            let mut entries = self.inner.entries();
            match entries.get(template_ref) {
                Some(Slot::Ready(entry)) if !entry.is_expired() => {
                    tracing::debug!(template = %template_ref, "template cache hit");
                    return Ok(Arc::clone(entry));
                }
                Some(Slot::Pending { load, .. }) => {
                    tracing::debug!(template = %template_ref, "joining in-flight template fetch");
                    load.clone()
                }
                _ => {
                    tracing::debug!(template = %template_ref, "template cache miss");
                    let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed) + 1;
                    let load = self.fetch(template_ref.to_string(), generation).shared();
                    entries.insert(
                        template_ref.to_string(),
                        Slot::Pending {
                            generation,
                            load: load.clone(),
                        },
                    );
                    load
                }
            }
        };

        pending.await
    }

    fn fetch(&self, template_ref: String, generation: u64) -> BoxFuture<'static, LoadResult> {
        let inner = Arc::clone(&self.inner);
        async move {
            let fetched = inner.fetcher.fetch(&template_ref).await;

            match fetched {
                Ok(raw) => {
                    let template = prepare_template(&template_ref, &raw, &inner.sanitizer);
                    let entry = Arc::new(CachedTemplate {
                        template,
                        expires_at: Instant::now() + inner.ttl,
                    });

                    let mut entries = inner.entries();
                    // An invalidate() while fetching leaves nothing to fill in
                    if owns_slot(&entries, &template_ref, generation) {
                        entries.insert(template_ref.clone(), Slot::Ready(Arc::clone(&entry)));
                    }
                    tracing::debug!(
                        template = %template_ref,
                        revision = %entry.template.revision_hash,
                        "template cached"
                    );
                    Ok(entry)
                }
                Err(cause) => {
                    let mut entries = inner.entries();
                    if owns_slot(&entries, &template_ref, generation) {
                        entries.remove(&template_ref);
                    }
                    tracing::warn!(template = %template_ref, error = %cause, "template fetch failed");
                    Err(LoadError { template_ref, cause })
                }
            }
        }
        .boxed()
    }

    /// Cached, unexpired template without triggering a fetch
    pub fn peek(&self, template_ref: &str) -> Option<Arc<CachedTemplate>> {
        match self.inner.entries().get(template_ref) {
            Some(Slot::Ready(entry)) if !entry.is_expired() => Some(Arc::clone(entry)),
            _ => None,
        }
    }

    /// Forget one entry. Returns whether there was one.
    pub fn invalidate(&self, template_ref: &str) -> bool {
        self.inner.entries().remove(template_ref).is_some()
    }

    pub fn clear(&self) {
        self.inner.entries().clear();
    }

    /// Number of entries, pending fetches included
    pub fn len(&self) -> usize {
        self.inner.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FetchError;
    use crate::fetcher::StaticFetcher;

    const HERO: &str = r#"<h1 onclick="x()">{title}</h1><template data-settings-schema><input name="title" value="Hi"></template>"#;

    fn cache_with(fetcher: Arc<StaticFetcher>) -> TemplateCache {
        TemplateCache::new(fetcher, DEFAULT_TTL)
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_prepares_and_caches() {
        let fetcher = Arc::new(StaticFetcher::new().with("hero", HERO));
        let cache = cache_with(Arc::clone(&fetcher));

        let first = cache.load("hero").await.unwrap();
        assert_eq!(first.template.cleaned_markup, "<h1>{title}</h1>");
        assert_eq!(first.template.schema.defaults().get("title").map(String::as_str), Some("Hi"));

        let second = cache.load("hero").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_loads_share_one_fetch() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .with("hero", HERO)
                .with_latency(Duration::from_millis(50)),
        );
        let cache = cache_with(Arc::clone(&fetcher));

        let results = futures::future::join_all((0..5).map(|_| cache.load("hero"))).await;

        assert_eq!(fetcher.fetch_count(), 1);
        let first = results[0].as_ref().unwrap();
        for result in &results {
            assert!(Arc::ptr_eq(first, result.as_ref().unwrap()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_refetches() {
        let fetcher = Arc::new(StaticFetcher::new().with("hero", HERO));
        let cache = TemplateCache::new(Arc::clone(&fetcher) as Arc<dyn TemplateFetcher>, Duration::from_secs(10));

        cache.load("hero").await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        cache.load("hero").await.unwrap();
        assert_eq!(fetcher.fetch_count(), 1);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(cache.peek("hero").is_none());
        cache.load("hero").await.unwrap();
        assert_eq!(fetcher.fetch_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_evicts_and_propagates_to_all_waiters() {
        let fetcher = Arc::new(StaticFetcher::new().with_latency(Duration::from_millis(20)));
        let cache = cache_with(Arc::clone(&fetcher));

        let (a, b) = futures::join!(cache.load("ghost"), cache.load("ghost"));
        let expected = LoadError {
            template_ref: "ghost".to_string(),
            cause: FetchError::NotFound("ghost".to_string()),
        };
        assert_eq!(a.unwrap_err(), expected);
        assert_eq!(b.unwrap_err(), expected);
        assert_eq!(fetcher.fetch_count(), 1);
        assert!(cache.is_empty());

        // Nothing stale left behind: the next load fetches again
        fetcher.insert("ghost", "<p>boo</p>");
        assert!(cache.load("ghost").await.is_ok());
        assert_eq!(fetcher.fetch_count(), 2);
    }

    fn spawn_load(cache: &TemplateCache, template_ref: &'static str) -> tokio::task::JoinHandle<LoadResult> {
        let cache = cache.clone();
        tokio::spawn(async move { cache.load(template_ref).await })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_outliving_invalidate_leaves_newer_slot_alone() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .with("hero", HERO)
                .with_latency(Duration::from_millis(50)),
        );
        let cache = cache_with(Arc::clone(&fetcher));

        let stale = spawn_load(&cache, "hero");
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(cache.invalidate("hero"));
        let fresh = spawn_load(&cache, "hero");
        // The stale fetch finishes while the fresh one is still running
        tokio::time::sleep(Duration::from_millis(45)).await;
        assert!(cache.peek("hero").is_none());

        let joined = cache.load("hero").await.unwrap();
        let fresh = fresh.await.unwrap().unwrap();
        let stale = stale.await.unwrap().unwrap();

        assert_eq!(fetcher.fetch_count(), 2);
        assert!(Arc::ptr_eq(&joined, &fresh));
        assert!(!Arc::ptr_eq(&stale, &fresh));
        assert!(Arc::ptr_eq(&cache.peek("hero").unwrap(), &fresh));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_stale_fetch_does_not_evict_newer_slot() {
        let fetcher = Arc::new(StaticFetcher::new().with_latency(Duration::from_millis(50)));
        let cache = cache_with(Arc::clone(&fetcher));

        let stale = spawn_load(&cache, "ghost");
        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.invalidate("ghost");
        let fresh = spawn_load(&cache, "ghost");
        tokio::time::sleep(Duration::from_millis(45)).await;
        // Too late for the stale fetch, in time for the fresh one
        fetcher.insert("ghost", "<p>boo</p>");

        assert!(stale.await.unwrap().is_err());
        assert_eq!(cache.len(), 1);
        let joined = cache.load("ghost").await.unwrap();

        assert_eq!(fetcher.fetch_count(), 2);
        assert!(Arc::ptr_eq(&joined, &fresh.await.unwrap().unwrap()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_and_clear() {
        let fetcher = Arc::new(StaticFetcher::new().with("a", "<p>a</p>").with("b", "<p>b</p>"));
        let cache = cache_with(Arc::clone(&fetcher));

        cache.load("a").await.unwrap();
        cache.load("b").await.unwrap();
        assert_eq!(cache.len(), 2);

        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        cache.load("a").await.unwrap();
        assert_eq!(fetcher.fetch_count(), 3);

        cache.clear();
        assert!(cache.is_empty());
    }
}
