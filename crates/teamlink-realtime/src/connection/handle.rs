//! Individual connection handle.

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use teamlink_core::types::{ConnectionId, UserId};

use crate::message::types::OutboundMessage;

/// Why a frame could not be queued on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendFailure {
    /// The transport side is gone; the connection must be removed.
    #[error("connection closed")]
    Closed,
    /// The outbound buffer is full; only this frame is lost.
    #[error("outbound buffer full")]
    Full,
}

/// A handle to a single live connection.
///
/// Holds the sender half of the connection's outbound queue plus metadata
/// about the connected user. Cloned `Arc`s stay valid after removal; sends on
/// a removed handle fail with [`SendFailure::Closed`].
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// User who owns this connection
    pub user_id: UserId,
    /// Username (cached for display)
    pub username: String,
    /// Sender for outbound frames
    sender: mpsc::Sender<OutboundMessage>,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Last inbound frame
    last_activity: RwLock<DateTime<Utc>>,
    /// Last pong received
    last_pong: RwLock<DateTime<Utc>>,
    /// Whether the connection is still alive
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(user_id: UserId, username: String, sender: mpsc::Sender<OutboundMessage>) -> Self {
        let now = Utc::now();
        Self {
            id: ConnectionId::generate(),
            user_id,
            username,
            sender,
            connected_at: now,
            last_activity: RwLock::new(now),
            last_pong: RwLock::new(now),
            alive: AtomicBool::new(true),
        }
    }

    /// Queue an outbound frame on this connection
    pub fn send(&self, msg: OutboundMessage) -> Result<(), SendFailure> {
        if !self.is_alive() {
            return Err(SendFailure::Closed);
        }
        match self.sender.try_send(msg) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Send buffer full, dropping frame");
                Err(SendFailure::Full)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                Err(SendFailure::Closed)
            }
        }
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Update last activity timestamp
    pub fn touch(&self) {
        *self.last_activity.write().unwrap_or_else(|e| e.into_inner()) = Utc::now();
    }

    /// Record a pong response
    pub fn record_pong(&self) {
        *self.last_pong.write().unwrap_or_else(|e| e.into_inner()) = Utc::now();
    }

    /// Last inbound frame time
    pub fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Last pong time
    pub fn last_pong(&self) -> DateTime<Utc> {
        *self.last_pong.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Get a snapshot of connection info
    pub fn info(&self, groups: Vec<String>) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            connected_at: self.connected_at,
            last_activity: self.last_activity(),
            groups,
            alive: self.is_alive(),
        }
    }
}

/// Snapshot of connection info (serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    /// Connection ID
    pub id: ConnectionId,
    /// User ID
    pub user_id: UserId,
    /// Username
    pub username: String,
    /// Connected at
    pub connected_at: DateTime<Utc>,
    /// Last activity
    pub last_activity: DateTime<Utc>,
    /// Groups joined
    pub groups: Vec<String>,
    /// Is alive
    pub alive: bool,
}
