//! Presence tracker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Presence tracking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Seconds without activity before an Online user is demoted to Away.
    #[serde(default = "default_inactivity_threshold")]
    pub inactivity_threshold_seconds: u64,
    /// Interval of the inactivity sweep in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl PresenceConfig {
    /// Inactivity threshold as a [`Duration`].
    pub fn inactivity_threshold(&self) -> Duration {
        Duration::from_secs(self.inactivity_threshold_seconds)
    }

    /// Sweep interval as a [`Duration`].
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            inactivity_threshold_seconds: default_inactivity_threshold(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

fn default_inactivity_threshold() -> u64 {
    300
}

fn default_sweep_interval() -> u64 {
    60
}
