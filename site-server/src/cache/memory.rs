//! In-process page cache with time-based revalidation.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{CacheError, PageCache};

/// A generated page.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPage {
    pub body: String,
    pub content_type: &'static str,
    pub tags: BTreeSet<String>,
    pub generated_at: Instant,
}

impl CachedPage {
    pub fn new(body: String, content_type: &'static str) -> Self {
        Self {
            body,
            content_type,
            tags: BTreeSet::new(),
            generated_at: Instant::now(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

/// Shared in-memory page cache.
///
/// Entries older than `revalidate_after` are reported as misses so the
/// caller regenerates them.
///
/// Every invalidation advances a generation counter. A page built from
/// records read before an invalidation is refused by `insert_if_unchanged`,
/// so an in-flight rebuild cannot put a stale page back.
#[derive(Clone)]
pub struct MemoryPageCache {
    inner: Arc<Inner>,
}

struct Inner {
    revalidate_after: Duration,
    /// Only advanced while `pages` is write-locked.
    generation: AtomicU64,
    pages: RwLock<HashMap<String, CachedPage>>,
}

impl MemoryPageCache {
    pub fn new(revalidate_after: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                revalidate_after,
                generation: AtomicU64::new(0),
                pages: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Fetch a fresh page, if one is cached.
    pub async fn get(&self, path: &str) -> Option<CachedPage> {
        let pages = self.inner.pages.read().await;
        let page = pages.get(path)?;

        if page.generated_at.elapsed() >= self.inner.revalidate_after {
            debug!(path = %path, "page_cache_stale");
            return None;
        }

        Some(page.clone())
    }

    pub async fn insert(&self, path: impl Into<String>, page: CachedPage) {
        let path = path.into();
        debug!(path = %path, tags = ?page.tags, "page_cache_insert");
        self.inner.pages.write().await.insert(path, page);
    }

    /// Current invalidation generation. Take it before reading the records
    /// a page is built from.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    /// Insert a page unless an invalidation ran since `generation` was taken.
    ///
    /// Returns whether the page was stored.
    pub async fn insert_if_unchanged(
        &self,
        path: impl Into<String>,
        page: CachedPage,
        generation: u64,
    ) -> bool {
        let path = path.into();
        let mut pages = self.inner.pages.write().await;

        let current = self.inner.generation.load(Ordering::Acquire);
        if current != generation {
            debug!(
                path = %path,
                built_at = generation,
                current = current,
                "page_cache_insert_skipped"
            );
            return false;
        }

        debug!(path = %path, tags = ?page.tags, "page_cache_insert");
        pages.insert(path, page);
        true
    }

    pub async fn len(&self) -> usize {
        self.inner.pages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.pages.read().await.is_empty()
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.inner.pages.read().await.contains_key(path)
    }
}

#[async_trait]
impl PageCache for MemoryPageCache {
    async fn invalidate_path(&self, path: &str) -> Result<(), CacheError> {
        if !path.starts_with('/') {
            return Err(CacheError::InvalidPath(path.to_string()));
        }

        let mut pages = self.inner.pages.write().await;
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        let removed = pages.remove(path).is_some();
        info!(path = %path, removed = removed, "page_cache_path_invalidated");
        Ok(())
    }

    async fn invalidate_tag(&self, tag: &str) -> Result<(), CacheError> {
        if tag.trim().is_empty() {
            return Err(CacheError::InvalidTag);
        }

        let mut pages = self.inner.pages.write().await;
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        let before = pages.len();
        pages.retain(|_, page| !page.tags.contains(tag));
        let removed = before - pages.len();

        info!(tag = %tag, removed = removed, "page_cache_tag_invalidated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> CachedPage {
        CachedPage::new(body.to_string(), "text/html; charset=utf-8")
    }

    #[tokio::test]
    async fn test_get_returns_fresh_page() {
        let cache = MemoryPageCache::new(Duration::from_secs(60));
        cache.insert("/brokers/acme", page("acme")).await;

        let hit = cache.get("/brokers/acme").await.unwrap();
        assert_eq!(hit.body, "acme");
        assert!(cache.get("/brokers/other").await.is_none());
    }

    #[tokio::test]
    async fn test_stale_page_is_a_miss() {
        let cache = MemoryPageCache::new(Duration::ZERO);
        cache.insert("/brokers", page("list")).await;

        assert!(cache.get("/brokers").await.is_none());
        assert!(cache.contains("/brokers").await);
    }

    #[tokio::test]
    async fn test_invalidate_path_removes_exact_path() {
        let cache = MemoryPageCache::new(Duration::from_secs(60));
        cache.insert("/brokers", page("list")).await;
        cache.insert("/brokers/acme", page("acme")).await;

        cache.invalidate_path("/brokers").await.unwrap();

        assert!(!cache.contains("/brokers").await);
        assert!(cache.contains("/brokers/acme").await);
    }

    #[tokio::test]
    async fn test_invalidate_tag_removes_all_tagged() {
        let cache = MemoryPageCache::new(Duration::from_secs(60));
        cache.insert("/brokers/acme", page("a").with_tag("broker-1")).await;
        cache.insert("/brokers/acme/amp", page("b").with_tag("broker-1")).await;
        cache.insert("/brokers/zeta", page("c").with_tag("broker-2")).await;

        cache.invalidate_tag("broker-1").await.unwrap();

        assert_eq!(cache.len().await, 1);
        assert!(cache.contains("/brokers/zeta").await);
    }

    #[tokio::test]
    async fn test_invalidation_is_idempotent() {
        let cache = MemoryPageCache::new(Duration::from_secs(60));
        cache.insert("/brokers/acme", page("a").with_tag("broker-1")).await;
        cache.insert("/brokers/zeta", page("z")).await;

        for _ in 0..2 {
            cache.invalidate_path("/brokers/acme").await.unwrap();
            cache.invalidate_tag("broker-1").await.unwrap();
        }

        assert_eq!(cache.len().await, 1);
        assert!(cache.contains("/brokers/zeta").await);
    }

    #[tokio::test]
    async fn test_invalid_targets_are_rejected() {
        let cache = MemoryPageCache::new(Duration::from_secs(60));
        assert!(matches!(
            cache.invalidate_path("brokers").await,
            Err(CacheError::InvalidPath(_))
        ));
        assert!(matches!(cache.invalidate_tag(" ").await, Err(CacheError::InvalidTag)));
    }

    #[tokio::test]
    async fn test_insert_after_invalidation_is_refused() {
        let cache = MemoryPageCache::new(Duration::from_secs(60));
        let generation = cache.generation();

        // A webhook lands while the page is being rebuilt.
        cache.invalidate_tag("broker-1").await.unwrap();

        let stored = cache
            .insert_if_unchanged("/brokers/acme", page("stale").with_tag("broker-1"), generation)
            .await;
        assert!(!stored);
        assert!(!cache.contains("/brokers/acme").await);

        let stored = cache
            .insert_if_unchanged("/brokers/acme", page("fresh"), cache.generation())
            .await;
        assert!(stored);
        assert_eq!(cache.get("/brokers/acme").await.unwrap().body, "fresh");
    }

    #[tokio::test]
    async fn test_every_invalidation_advances_generation() {
        let cache = MemoryPageCache::new(Duration::from_secs(60));
        let start = cache.generation();

        cache.invalidate_path("/brokers/missing").await.unwrap();
        cache.invalidate_tag("broker-9").await.unwrap();

        assert_eq!(cache.generation(), start + 2);
        assert!(cache.invalidate_path("no-slash").await.is_err());
        assert_eq!(cache.generation(), start + 2);
    }
}
