//! Per-user presence record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use teamlink_core::types::{PresenceStatus, UserId};

/// Presence state of a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    /// User ID
    pub user_id: UserId,
    /// Current status
    pub status: PresenceStatus,
    /// Free-text status message
    pub status_message: Option<String>,
    /// Whether the user accepts chat
    pub is_available_for_chat: bool,
    /// Last observed activity
    pub last_activity: Option<DateTime<Utc>>,
    /// Live connections the user holds
    pub live_connections: usize,
}

impl PresenceRecord {
    /// Record for a user never seen or fully disconnected.
    pub fn offline(user_id: UserId) -> Self {
        Self {
            user_id,
            status: PresenceStatus::Offline,
            status_message: None,
            is_available_for_chat: true,
            last_activity: None,
            live_connections: 0,
        }
    }

    /// Whether the user holds at least one live connection.
    pub fn is_connected(&self) -> bool {
        self.live_connections > 0
    }

    /// Whether the record counts as online (any status but Offline).
    pub fn is_online(&self) -> bool {
        self.status != PresenceStatus::Offline
    }
}
