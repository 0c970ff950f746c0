//! Sanitized-import cache using moka
//!
//! Generated documents tend to be imported more than once (retries, the
//! handoff key and a manual import of the same file). Results are keyed by the
//! Blake3 hash of the raw input plus the allow-list name, so the same bytes
//! under a different profile are sanitized afresh.

use archify_scene::{Fingerprint, SceneDocument};
use moka::future::Cache;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cache key: raw content plus the allow-list it was sanitized against
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportKey {
    pub content: Fingerprint,
    pub allow_list: String,
}

impl ImportKey {
    #[must_use]
    pub fn new(content: Fingerprint, allow_list: impl Into<String>) -> Self {
        Self {
            content,
            allow_list: allow_list.into(),
        }
    }
}

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently held (eventually consistent)
    pub entry_count: u64,
    pub hits: u64,
    pub misses: u64,
}

/// Bounded concurrent cache of sanitized documents
#[derive(Debug, Clone)]
pub struct SanitizeCache {
    inner: Cache<ImportKey, Arc<SceneDocument>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl SanitizeCache {
    /// Create new cache with max capacity
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self::from_cache(Cache::new(max_capacity))
    }

    /// Create cache with time-based expiration
    #[must_use]
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        Self::from_cache(
            Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        )
    }

    fn from_cache(inner: Cache<ImportKey, Arc<SceneDocument>>) -> Self {
        Self {
            inner,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cached document for `key`
    pub async fn get(&self, key: &ImportKey) -> Option<Arc<SceneDocument>> {
        let found = self.inner.get(key).await;
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub async fn insert(&self, key: ImportKey, document: Arc<SceneDocument>) {
        self.inner.insert(key, document).await;
    }

    /// Get or compute the sanitized document
    pub async fn get_or_insert_with<F, Fut>(&self, key: ImportKey, f: F) -> Arc<SceneDocument>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SceneDocument>,
    {
        if let Some(cached) = self.get(&key).await {
            tracing::debug!(content = %key.content.short(), allow_list = %key.allow_list, "import cache hit");
            return cached;
        }

        let document = Arc::new(f().await);
        self.insert(key, Arc::clone(&document)).await;
        document
    }

    /// Invalidate all entries
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.entry_count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(content: &str, allow_list: &str) -> ImportKey {
        ImportKey::new(Fingerprint::of_bytes(content.as_bytes()), allow_list)
    }

    #[tokio::test]
    async fn computes_once_per_key() {
        let cache = SanitizeCache::new(16);
        let mut doc = SceneDocument::new();
        doc.extra.insert("unit".into(), json!("cm"));

        let first = cache
            .get_or_insert_with(key("raw", "external-import"), || {
                let doc = doc.clone();
                async move { doc }
            })
            .await;
        let second = cache
            .get_or_insert_with(key("raw", "external-import"), || async { SceneDocument::new() })
            .await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.extra["unit"], "cm");
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[tokio::test]
    async fn allow_list_is_part_of_the_key() {
        let cache = SanitizeCache::new(16);
        cache
            .insert(key("raw", "autosave"), Arc::new(SceneDocument::new()))
            .await;

        assert!(cache.get(&key("raw", "autosave")).await.is_some());
        assert!(cache.get(&key("raw", "external-import")).await.is_none());
        assert!(cache.get(&key("other", "autosave")).await.is_none());
    }

    #[tokio::test]
    async fn invalidate_all_clears() {
        let cache = SanitizeCache::with_ttl(4, Duration::from_secs(60));
        cache
            .insert(key("raw", "autosave"), Arc::new(SceneDocument::new()))
            .await;
        cache.invalidate_all();
        assert!(cache.get(&key("raw", "autosave")).await.is_none());
    }
}
