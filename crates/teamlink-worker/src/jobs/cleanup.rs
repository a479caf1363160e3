//! Pending-message expiry sweep.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use teamlink_realtime::MessageStore;

use crate::executor::{JobExecutionError, JobHandler};

/// Removes expired messages from the pending store
#[derive(Debug)]
pub struct ExpiryCleanupHandler {
    /// Pending-message store
    store: Arc<MessageStore>,
}

impl ExpiryCleanupHandler {
    /// Create a new expiry cleanup handler
    pub fn new(store: Arc<MessageStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl JobHandler for ExpiryCleanupHandler {
    fn job_type(&self) -> &'static str {
        "message_expiry"
    }

    async fn execute(&self) -> Result<Value, JobExecutionError> {
        tracing::debug!("Running pending-message expiry sweep");

        let removed = self.store.cleanup_expired_messages().await;

        Ok(serde_json::json!({
            "task": "message_expiry",
            "expired_removed": removed,
            "still_pending": self.store.pending_count(),
        }))
    }
}
