//! Side-store mirror of pending messages.
//!
//! The in-memory store is authoritative; the mirror only lets pending
//! messages survive a restart. Mirror failures are logged, never surfaced.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use teamlink_cache::keys;
use teamlink_core::result::AppResult;
use teamlink_core::traits::cache::CacheProvider;
use teamlink_core::types::MessageId;

use super::pending::PendingMessage;

/// Mirrors pending messages into a [`CacheProvider`].
#[derive(Debug, Clone)]
pub struct PendingMirror {
    cache: Arc<dyn CacheProvider>,
}

impl PendingMirror {
    /// Create a mirror over a side store.
    pub fn new(cache: Arc<dyn CacheProvider>) -> Self {
        Self { cache }
    }

    /// Write a message with a TTL matching its remaining lifetime.
    pub async fn save(&self, message: &PendingMessage) {
        let remaining = (message.expires_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        if remaining.is_zero() {
            return;
        }

        let key = keys::pending_message(message.id.as_str());
        let value = match serde_json::to_string(message) {
            Ok(v) => v,
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "Failed to serialize pending message");
                return;
            }
        };
        if let Err(e) = self.cache.set(&key, &value, remaining).await {
            warn!(message_id = %message.id, error = %e, "Failed to mirror pending message");
        }
    }

    /// Remove a message from the mirror.
    pub async fn remove(&self, id: &MessageId) {
        let key = keys::pending_message(id.as_str());
        if let Err(e) = self.cache.delete(&key).await {
            warn!(message_id = %id, error = %e, "Failed to remove mirrored message");
        }
    }

    /// Load every mirrored message. Unreadable entries are skipped.
    pub async fn load_all(&self) -> AppResult<Vec<PendingMessage>> {
        let raw = self.cache.get_pattern(&keys::pending_message_pattern()).await?;
        let mut messages = Vec::with_capacity(raw.len());
        for value in raw {
            match serde_json::from_str::<PendingMessage>(&value) {
                Ok(message) => messages.push(message),
                Err(e) => debug!(error = %e, "Skipping unreadable mirrored message"),
            }
        }
        Ok(messages)
    }
}
