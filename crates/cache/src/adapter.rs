use std::sync::Arc;
use std::time::Duration;

use crate::store::CacheStore;

/// Fail-open front for a [`CacheStore`].
///
/// Reads that fail are misses and writes that fail are dropped; neither is
/// ever reported to the caller. A disconnected adapter behaves as an always
/// empty cache.
#[derive(Clone, Default)]
pub struct CacheAdapter {
    store: Option<Arc<dyn CacheStore>>,
}

impl CacheAdapter {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store: Some(store) }
    }

    /// An adapter with no backing store.
    pub fn disconnected() -> Self {
        Self { store: None }
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_some()
    }

    /// Backend name, or `"disconnected"`.
    pub fn backend(&self) -> &'static str {
        self.store.as_ref().map_or("disconnected", |s| s.backend())
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let store = self.store.as_ref()?;
        match store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    key,
                    backend = store.backend(),
                    error = %e,
                    "cache read failed, treating as miss"
                );
                None
            }
        }
    }

    pub async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        if let Err(e) = store.set_ex(key, value, ttl).await {
            tracing::warn!(
                key,
                backend = store.backend(),
                error = %e,
                "cache write failed, skipping"
            );
        }
    }
}

impl std::fmt::Debug for CacheAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAdapter")
            .field("backend", &self.backend())
            .finish()
    }
}
