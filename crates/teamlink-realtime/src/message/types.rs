//! Inbound and outbound WebSocket frame definitions.
//!
//! Frames are JSON objects discriminated by `type`; field names are camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use teamlink_core::types::{DeliveryStatus, MessageId, MessageType, PresenceStatus, UserId};

use super::envelope::DeliveryEnvelope;

/// Frames sent by the client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Send a message to a user, a group (`to` = `group:<name>`), or everyone (`to` = `*`).
    #[serde(rename_all = "camelCase")]
    Message {
        /// Client-chosen message ID; generated when absent.
        #[serde(default)]
        id: Option<MessageId>,
        /// Recipient.
        to: String,
        /// Message body.
        content: String,
        /// Message classification.
        #[serde(default)]
        message_type: MessageType,
        /// Whether the recipient must acknowledge.
        #[serde(default)]
        requires_ack: bool,
        /// Client correlation ID echoed in the `accepted` frame.
        #[serde(default)]
        correlation_id: Option<String>,
        /// Message being replied to.
        #[serde(default)]
        reply_to: Option<MessageId>,
        /// Store for later delivery if the recipient cannot be reached.
        #[serde(default)]
        queue_if_offline: Option<bool>,
    },
    /// Acknowledge a delivered frame.
    #[serde(rename_all = "camelCase")]
    Ack {
        /// Correlation ID of the frame being acknowledged.
        correlation_id: String,
        /// Message ID, informational.
        #[serde(default)]
        id: Option<MessageId>,
    },
    /// Delivered/Read receipt for a message.
    #[serde(rename_all = "camelCase")]
    Receipt {
        /// Message ID.
        id: MessageId,
        /// Reported status.
        status: DeliveryStatus,
    },
    /// Pong response to a server ping.
    Pong {
        /// Echoed timestamp.
        #[serde(default)]
        timestamp: Option<i64>,
    },
    /// Set own presence status.
    #[serde(rename_all = "camelCase")]
    Presence {
        /// New status (`Online`, `Away`, `Busy`, `DoNotDisturb`/`dnd`, `Offline`).
        status: String,
        /// Optional status message.
        #[serde(default)]
        message: Option<String>,
    },
    /// Set own chat availability.
    #[serde(rename_all = "camelCase")]
    Availability {
        /// Whether the user accepts chat.
        is_available: bool,
    },
    /// Explicit activity signal without other effect.
    Activity,
    /// Join a named group.
    JoinGroup {
        /// Group name.
        group: String,
    },
    /// Leave a named group.
    LeaveGroup {
        /// Group name.
        group: String,
    },
}

/// Frames sent by the server to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// A message for this user.
    Message(DeliveryEnvelope),
    /// Result of a `message` frame this client sent.
    #[serde(rename_all = "camelCase")]
    Accepted {
        /// Message ID assigned to the send.
        id: MessageId,
        /// Client correlation ID, echoed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        correlation_id: Option<String>,
        /// `delivered`, `transmitted`, `stored_pending`, or `dropped`.
        outcome: String,
        /// Connections the message reached.
        reached: usize,
    },
    /// A recipient's receipt for a message this user sent.
    #[serde(rename_all = "camelCase")]
    Receipt {
        /// Message ID.
        id: MessageId,
        /// Recipient who sent the receipt.
        from: UserId,
        /// Reported status.
        status: DeliveryStatus,
        /// When the receipt was processed.
        timestamp: DateTime<Utc>,
    },
    /// Presence change for a user.
    #[serde(rename_all = "camelCase")]
    Presence {
        /// User ID.
        user_id: UserId,
        /// Current status.
        status: PresenceStatus,
        /// Status message.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        /// Chat availability.
        is_available: bool,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Heartbeat ping.
    Ping {
        /// Server time in epoch milliseconds.
        timestamp: i64,
    },
    /// Group membership confirmed.
    Joined {
        /// Group name.
        group: String,
    },
    /// Group membership removed.
    Left {
        /// Group name.
        group: String,
    },
    /// Error response.
    Error {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
    },
}

impl OutboundMessage {
    /// The `type` tag of the frame.
    pub fn frame_type(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::Accepted { .. } => "accepted",
            Self::Receipt { .. } => "receipt",
            Self::Presence { .. } => "presence",
            Self::Ping { .. } => "ping",
            Self::Joined { .. } => "joined",
            Self::Left { .. } => "left",
            Self::Error { .. } => "error",
        }
    }
}
