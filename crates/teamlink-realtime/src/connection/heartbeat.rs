//! Ping/pong heartbeat for connection keepalive.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time;

use teamlink_core::config::RealtimeConfig;

use super::handle::ConnectionHandle;
use super::registry::ConnectionRegistry;
use crate::message::builder::build_ping;

/// Heartbeat configuration
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between pings
    pub ping_interval: Duration,
    /// Timeout before considering connection dead
    pub ping_timeout: Duration,
}

impl From<&RealtimeConfig> for HeartbeatConfig {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            ping_interval: config.ping_interval(),
            ping_timeout: config.ping_timeout(),
        }
    }
}

/// Run the heartbeat loop for a connection.
///
/// Sends periodic pings and checks for pong responses. A connection with no
/// pong within the timeout, or whose ping cannot be queued, is removed from
/// the registry as failed.
pub async fn run_heartbeat(
    handle: Arc<ConnectionHandle>,
    registry: Arc<ConnectionRegistry>,
    config: HeartbeatConfig,
) {
    let mut interval = time::interval(config.ping_interval);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        interval.tick().await;

        if !handle.is_alive() {
            break;
        }

        if let Ok(elapsed) = (Utc::now() - handle.last_pong()).to_std()
            && elapsed > config.ping_timeout
        {
            tracing::warn!(
                conn_id = %handle.id,
                elapsed_ms = elapsed.as_millis() as u64,
                "Heartbeat timeout"
            );
            registry.mark_failed(&handle.id);
            break;
        }

        if !registry.send_to_connection(&handle.id, build_ping()) && !handle.is_alive() {
            tracing::debug!(conn_id = %handle.id, "Ping send failed");
            break;
        }
    }

    tracing::debug!(conn_id = %handle.id, "Heartbeat loop ended");
}
