//! Request DTOs.

use serde::{Deserialize, Serialize};

use teamlink_core::types::{MessageId, MessageType, UserId};

/// POST /api/messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Caller-chosen message ID for idempotent retries.
    #[serde(default)]
    pub id: Option<MessageId>,
    /// Recipient user, `group:<name>`, or `*`.
    pub to: String,
    /// Message body.
    pub content: String,
    /// Classification.
    #[serde(default)]
    pub message_type: MessageType,
    /// Wait for the recipient's ack (default true).
    #[serde(default)]
    pub requires_ack: Option<bool>,
    /// Store when the recipient cannot be reached (configured default).
    #[serde(default)]
    pub queue_if_offline: Option<bool>,
    /// Pending lifetime in seconds (configured default).
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
    /// Message being replied to.
    #[serde(default)]
    pub reply_to: Option<MessageId>,
}

/// POST /api/presence/query
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceQueryRequest {
    /// Users to look up.
    pub user_ids: Vec<UserId>,
}

/// PUT /api/presence/status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    /// `Online`, `Away`, `Busy`, `DoNotDisturb` or `Offline`.
    pub status: String,
    /// Free-form status message.
    #[serde(default)]
    pub message: Option<String>,
}

/// PUT /api/presence/availability
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAvailabilityRequest {
    /// Whether the caller accepts chats.
    pub is_available: bool,
}

/// Query string of the WebSocket upgrade.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WsQuery {
    /// Access token, for clients that cannot set headers on the upgrade.
    #[serde(default)]
    pub token: Option<String>,
}
