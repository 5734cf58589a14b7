//! Single-process cache backed by a `DashMap`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::error::CacheResult;
use crate::store::CacheStore;

/// A cached value and the instant it stops being served.
#[derive(Clone, Debug)]
struct CachedEntry {
    value: Arc<str>,
    expires_at: Instant,
}

impl CachedEntry {
    fn new(value: &str, ttl: Duration) -> Self {
        Self {
            value: Arc::from(value),
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// How often a write sweeps every expired entry out of the map.
const SWEEP_PERIOD: Duration = Duration::from_secs(60);

/// In-process cache.
///
/// An expired key is dropped when it is read, and a write sweeps the whole
/// map at most once per [`SWEEP_PERIOD`], so keys that are never read again
/// still get reclaimed. Expiry follows the tokio clock, so paused-time tests
/// can step past a TTL.
#[derive(Clone)]
pub struct LocalCache {
    entries: Arc<DashMap<String, CachedEntry>>,
    next_sweep: Arc<Mutex<Instant>>,
}

impl Default for LocalCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            next_sweep: Arc::new(Mutex::new(Instant::now() + SWEEP_PERIOD)),
        }
    }

    fn sweep_if_due(&self) {
        // A held lock means another writer is already sweeping.
        let Ok(mut next_sweep) = self.next_sweep.try_lock() else {
            return;
        };
        let now = Instant::now();
        if now < *next_sweep {
            return;
        }
        *next_sweep = now + SWEEP_PERIOD;
        drop(next_sweep);

        if self.is_empty() {
            return;
        }
        let before = self.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        tracing::trace!(
            evicted = before.saturating_sub(self.len()),
            "local cache sweep"
        );
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for LocalCache {
    fn backend(&self) -> &'static str {
        "local"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                return Ok(Some(entry.value.to_string()));
            }
            // Release the shard read lock before removing. A concurrent
            // write may have replaced the entry since, so re-check expiry.
            drop(entry);
            self.entries.remove_if(key, |_, entry| entry.is_expired());
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.sweep_if_due();
        self.entries
            .insert(key.to_string(), CachedEntry::new(value, ttl));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_value_until_ttl_elapses() {
        tokio::time::pause();
        let cache = LocalCache::new();
        cache
            .set_ex("books:all", "[]", Duration::from_secs(300))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get("books:all").await.unwrap().as_deref(), Some("[]"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("books:all").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn set_overwrites_and_restarts_ttl() {
        tokio::time::pause();
        let cache = LocalCache::new();
        cache.set_ex("k", "old", Duration::from_secs(10)).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.set_ex("k", "new", Duration::from_secs(10)).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("new"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn expired_keys_are_reclaimed_without_being_read() {
        tokio::time::pause();
        let cache = LocalCache::new();
        for i in 0..10_000 {
            cache
                .set_ex(&format!("search:q{i}"), "[]", Duration::from_secs(300))
                .await
                .unwrap();
        }
        assert_eq!(cache.len(), 10_000);

        tokio::time::advance(Duration::from_secs(3600)).await;
        cache
            .set_ex("books:all", "[]", Duration::from_secs(300))
            .await
            .unwrap();
        assert_eq!(cache.get("search:q0").await.unwrap(), None);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("books:all").await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn sweep_keeps_live_entries() {
        tokio::time::pause();
        let cache = LocalCache::new();
        cache.set_ex("short", "a", Duration::from_secs(10)).await.unwrap();
        cache.set_ex("long", "b", Duration::from_secs(600)).await.unwrap();

        tokio::time::advance(SWEEP_PERIOD).await;
        cache.set_ex("fresh", "c", Duration::from_secs(10)).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("long").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn read_of_expired_key_does_not_drop_a_fresh_write() {
        tokio::time::pause();
        let cache = LocalCache::new();
        cache.set_ex("k", "old", Duration::from_secs(1)).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        cache.set_ex("k", "new", Duration::from_secs(10)).await.unwrap();

        cache.entries.remove_if("k", |_, entry| entry.is_expired());
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let cache = LocalCache::new();
        assert_eq!(cache.get("nope").await.unwrap(), None);
    }
}
