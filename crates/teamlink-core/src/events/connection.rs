//! Connection lifecycle events.

use serde::{Deserialize, Serialize};

use super::EventKind;
use crate::types::{ConnectionId, UserId};

/// Events related to transport connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConnectionEvent {
    /// A connection was registered.
    Opened {
        /// Connection ID.
        connection_id: ConnectionId,
        /// Owning user.
        user_id: UserId,
        /// Live connections the user has after this one opened.
        live_connections: usize,
    },
    /// A connection was removed (explicit close or detected failure).
    Closed {
        /// Connection ID.
        connection_id: ConnectionId,
        /// Owning user.
        user_id: UserId,
        /// Live connections the user still has.
        remaining: usize,
        /// Whether removal followed a transmission failure.
        failed: bool,
    },
}

impl ConnectionEvent {
    /// Subscription kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Opened { .. } => EventKind::ConnectionOpened,
            Self::Closed { .. } => EventKind::ConnectionClosed,
        }
    }
}
