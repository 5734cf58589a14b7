//! Cache adapters for the catalog read path.
//!
//! ## Backends
//!
//! | URL scheme | Backend | Scope |
//! |------------|---------|-------|
//! | `memory://` | [`LocalCache`] (DashMap) | this process |
//! | `redis://`, `rediss://` | [`RedisCache`] (deadpool-redis) | every instance |
//!
//! Callers go through [`CacheAdapter`], which never surfaces a cache failure.

use std::sync::Arc;
use std::time::Duration;

use bookbay_kernel::settings::CacheSettings;

pub mod adapter;
pub mod error;
pub mod local;
pub mod remote;
pub mod store;

pub use adapter::CacheAdapter;
pub use error::{CacheError, CacheResult};
pub use local::LocalCache;
pub use remote::RedisCache;
pub use store::CacheStore;

/// Open the configured backend and wrap it in a [`CacheAdapter`].
///
/// Failures are logged and produce a disconnected adapter so the caller can
/// keep serving from the store.
pub async fn connect(settings: &CacheSettings) -> CacheAdapter {
    match open(settings).await {
        Ok(store) => {
            tracing::info!(
                target: "bookbay-cache",
                backend = store.backend(),
                "cache connected"
            );
            CacheAdapter::new(store)
        }
        Err(e) => {
            tracing::warn!(
                target: "bookbay-cache",
                url = %settings.url,
                error = %e,
                "cache connection failed, continuing without cache"
            );
            CacheAdapter::disconnected()
        }
    }
}

async fn open(settings: &CacheSettings) -> CacheResult<Arc<dyn CacheStore>> {
    let url = settings.url.as_str();
    if url.starts_with("memory://") {
        return Ok(Arc::new(LocalCache::new()));
    }
    if url.starts_with("redis://") || url.starts_with("rediss://") {
        let cache = RedisCache::new(
            url,
            settings.pool_size,
            Duration::from_millis(settings.timeout_ms),
        )?;
        cache.ping().await?;
        return Ok(Arc::new(cache));
    }
    Err(CacheError::UnsupportedUrl(settings.url.clone()))
}
