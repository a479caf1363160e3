//! Presence inactivity sweep: demotes idle Online users to Away.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use teamlink_realtime::PresenceTracker;

use crate::executor::{JobExecutionError, JobHandler};

/// Runs [`PresenceTracker::check_inactive_users`]
#[derive(Debug)]
pub struct InactivitySweepHandler {
    /// Presence tracker
    presence: Arc<PresenceTracker>,
}

impl InactivitySweepHandler {
    /// Create a new inactivity sweep handler
    pub fn new(presence: Arc<PresenceTracker>) -> Self {
        Self { presence }
    }
}

#[async_trait]
impl JobHandler for InactivitySweepHandler {
    fn job_type(&self) -> &'static str {
        "presence_inactivity"
    }

    async fn execute(&self) -> Result<Value, JobExecutionError> {
        tracing::trace!("Running presence inactivity sweep");

        let demoted = self.presence.check_inactive_users();
        if demoted > 0 {
            tracing::info!(demoted, "Presence sweep: idle users marked away");
        }

        Ok(serde_json::json!({
            "task": "presence_inactivity",
            "demoted": demoted,
            "online": self.presence.online_count(),
        }))
    }
}
