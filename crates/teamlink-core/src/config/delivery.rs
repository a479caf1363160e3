//! Delivery protocol and pending-message store configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Delivery protocol settings.
///
/// The ack window and TTL are tunables; the protocol makes no retry
/// attempts of its own beyond storing an unacknowledged message and
/// draining it on the recipient's next connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// How long a transmitted frame waits for an ack before being stored.
    #[serde(default = "default_ack_timeout")]
    pub ack_timeout_ms: u64,
    /// Default time-to-live of a pending message in seconds.
    #[serde(default = "default_ttl")]
    pub default_ttl_seconds: u64,
    /// Interval of the expiry sweep in seconds.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
    /// Mirror pending messages into the side store for restart survival.
    #[serde(default = "default_true")]
    pub persist_pending: bool,
    /// Store messages for unreachable recipients when the sender does not say.
    #[serde(default = "default_true")]
    pub queue_if_offline_default: bool,
}

impl DeliveryConfig {
    /// Ack window as a [`Duration`].
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    /// Default TTL as a [`Duration`].
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    /// Expiry sweep interval as a [`Duration`].
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds)
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: default_ack_timeout(),
            default_ttl_seconds: default_ttl(),
            cleanup_interval_seconds: default_cleanup_interval(),
            persist_pending: true,
            queue_if_offline_default: true,
        }
    }
}

fn default_ack_timeout() -> u64 {
    10_000
}

fn default_ttl() -> u64 {
    86_400
}

fn default_cleanup_interval() -> u64 {
    300
}

fn default_true() -> bool {
    true
}
