use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheResult;

/// A key-value store with per-entry expiry.
///
/// Implementations report every failure; the fail-open policy lives in
/// [`crate::CacheAdapter`].
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store `value` under `key`, expiring `ttl` after the write.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;
}
