//! Delivery envelope framing a message on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use teamlink_core::types::{DeliveryStatus, MessageId, MessageType, UserId};

use super::types::OutboundMessage;
use crate::store::PendingMessage;

/// Wire form of a message delivered to a recipient connection.
///
/// Every transmission attempt carries a fresh `correlation_id`; the client
/// echoes it in its `ack` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryEnvelope {
    /// Message ID, stable across attempts
    pub id: MessageId,
    /// Sender
    pub from: UserId,
    /// Recipient (user, `group:<name>`, or `*`)
    pub to: UserId,
    /// Message body
    pub content: String,
    /// When the message was first accepted
    pub timestamp: DateTime<Utc>,
    /// Message classification
    #[serde(default)]
    pub message_type: MessageType,
    /// Delivery status at transmission time
    #[serde(default)]
    pub status: DeliveryStatus,
    /// Whether the client must ack this frame
    pub requires_ack: bool,
    /// Per-attempt correlation ID
    pub correlation_id: String,
    /// Message being replied to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<MessageId>,
}

impl DeliveryEnvelope {
    /// Frame a message for one transmission attempt.
    pub fn for_message(message: &PendingMessage, requires_ack: bool) -> Self {
        Self {
            id: message.id.clone(),
            from: message.sender.clone(),
            to: message.recipient.clone(),
            content: message.content.clone(),
            timestamp: message.created_at,
            message_type: message.message_type,
            status: message.status,
            requires_ack,
            correlation_id: Uuid::new_v4().to_string(),
            reply_to: message.reply_to.clone(),
        }
    }

    /// Wrap into an outbound frame.
    pub fn into_frame(self) -> OutboundMessage {
        OutboundMessage::Message(self)
    }
}
