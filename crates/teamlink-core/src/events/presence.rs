//! Presence-related events.

use serde::{Deserialize, Serialize};

use super::EventKind;
use crate::types::{PresenceStatus, UserId};

/// Events related to user presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PresenceEvent {
    /// A user's status changed (or was explicitly re-set).
    StatusChanged {
        /// The user ID.
        user_id: UserId,
        /// Status before the change.
        old_status: PresenceStatus,
        /// Status after the change.
        new_status: PresenceStatus,
        /// Free-text status message.
        message: Option<String>,
    },
    /// A user's chat availability flag was set.
    AvailabilityChanged {
        /// The user ID.
        user_id: UserId,
        /// New availability.
        is_available: bool,
    },
    /// A user showed activity.
    ActivityPing {
        /// The user ID.
        user_id: UserId,
    },
}

impl PresenceEvent {
    /// Subscription kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::StatusChanged { .. } => EventKind::StatusChanged,
            Self::AvailabilityChanged { .. } => EventKind::AvailabilityChanged,
            Self::ActivityPing { .. } => EventKind::ActivityPing,
        }
    }
}
