//! Real-time transport and connection registry configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection registry and WebSocket transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Maximum live connections per user (oldest is evicted beyond this).
    #[serde(default = "default_max_connections_per_user")]
    pub max_connections_per_user: usize,
    /// Outbound frame buffer per connection.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// WebSocket ping interval in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Seconds without a pong before a connection is considered dead.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_seconds: u64,
    /// Maximum group memberships per connection.
    #[serde(default = "default_max_groups")]
    pub max_groups_per_connection: usize,
    /// Maximum accepted inbound frame size in bytes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
    /// Interval of the dead-connection reaper in seconds.
    #[serde(default = "default_reap_interval")]
    pub reap_interval_seconds: u64,
}

impl RealtimeConfig {
    /// Ping interval as a [`Duration`].
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_seconds)
    }

    /// Pong timeout as a [`Duration`].
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_seconds)
    }

    /// Reaper interval as a [`Duration`].
    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_seconds)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            max_connections_per_user: default_max_connections_per_user(),
            channel_buffer_size: default_channel_buffer(),
            ping_interval_seconds: default_ping_interval(),
            ping_timeout_seconds: default_ping_timeout(),
            max_groups_per_connection: default_max_groups(),
            max_frame_bytes: default_max_frame_bytes(),
            reap_interval_seconds: default_reap_interval(),
        }
    }
}

fn default_max_connections_per_user() -> usize {
    5
}

fn default_channel_buffer() -> usize {
    256
}

fn default_ping_interval() -> u64 {
    30
}

fn default_ping_timeout() -> u64 {
    90
}

fn default_max_groups() -> usize {
    50
}

fn default_max_frame_bytes() -> usize {
    65_536
}

fn default_reap_interval() -> u64 {
    60
}
