//! Redis side-store provider implementation.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use teamlink_core::error::{AppError, ErrorKind};
use teamlink_core::result::AppResult;
use teamlink_core::traits::cache::CacheProvider;

use super::client::RedisClient;

/// Redis-backed side-store provider.
#[derive(Debug, Clone)]
pub struct RedisCacheProvider {
    /// Redis client.
    client: RedisClient,
}

impl RedisCacheProvider {
    /// Create a new Redis provider.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Map a Redis error to an AppError.
    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::Cache, format!("Redis error: {e}"), e)
    }

    /// Collect full keys matching a relative pattern with SCAN.
    async fn scan_keys(&self, pattern: &str) -> AppResult<Vec<String>> {
        let full_pattern = self.client.prefixed_key(pattern);
        let mut conn = self.client.conn_mut();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&full_pattern)
                .arg("COUNT")
                .arg(500)
                .query_async(&mut conn)
                .await
                .map_err(Self::map_err)?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(keys)
    }
}

#[async_trait]
impl CacheProvider for RedisCacheProvider {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        // SETEX rejects 0; a zero TTL means "already expired".
        if ttl.as_secs() == 0 {
            let _: () = conn.del(&full_key).await.map_err(Self::map_err)?;
            return Ok(());
        }
        let _: () = conn
            .set_ex(&full_key, value, ttl.as_secs())
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = conn.del(&full_key).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn get_pattern(&self, pattern: &str) -> AppResult<Vec<String>> {
        let keys = self.scan_keys(pattern).await?;
        let mut conn = self.client.conn_mut();
        let mut values = Vec::with_capacity(keys.len());
        for key in &keys {
            // A key can expire between SCAN and GET.
            let value: Option<String> = conn.get(key).await.map_err(Self::map_err)?;
            match value {
                Some(value) => values.push(value),
                None => debug!(key = self.client.unprefixed_key(key), "Key expired during scan"),
            }
        }
        Ok(values)
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }
}
