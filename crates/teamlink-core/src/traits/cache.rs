//! Side-store trait for pluggable key/value backends.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// Key/value side store (Redis or in-memory).
///
/// All values are strings (JSON). The realtime core only writes, removes
/// and bulk-loads entries; the provider owns key prefixing and TTL
/// enforcement.
#[async_trait]
pub trait CacheProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Set a value with a TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Return every live value whose key matches a trailing-`*` pattern.
    async fn get_pattern(&self, pattern: &str) -> AppResult<Vec<String>>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
