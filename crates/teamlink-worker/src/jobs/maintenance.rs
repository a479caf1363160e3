//! Dead-connection reaper.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use teamlink_realtime::ConnectionRegistry;

use crate::executor::{JobExecutionError, JobHandler};

/// Removes connections already flagged dead but not yet unregistered
#[derive(Debug)]
pub struct ConnectionReaperHandler {
    registry: Arc<ConnectionRegistry>,
}

impl ConnectionReaperHandler {
    /// Create a new reaper handler
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl JobHandler for ConnectionReaperHandler {
    fn job_type(&self) -> &'static str {
        "connection_reaper"
    }

    async fn execute(&self) -> Result<Value, JobExecutionError> {
        let reaped = self.registry.reap_dead_connections();

        Ok(serde_json::json!({
            "task": "connection_reaper",
            "reaped": reaped,
            "live": self.registry.connection_count(),
        }))
    }
}
