//! The pending message record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use teamlink_core::types::{DeliveryStatus, MessageId, MessageType, UserId};

/// A message awaiting delivery to its recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingMessage {
    /// Message ID; blank IDs are replaced on store.
    pub id: MessageId,
    /// Sender.
    pub sender: UserId,
    /// Recipient.
    pub recipient: UserId,
    /// Message body.
    pub content: String,
    /// Classification.
    #[serde(default)]
    pub message_type: MessageType,
    /// Message being replied to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<MessageId>,
    /// When the message was first accepted.
    pub created_at: DateTime<Utc>,
    /// When the message may be discarded.
    pub expires_at: DateTime<Utc>,
    /// Delivery status.
    #[serde(default)]
    pub status: DeliveryStatus,
    /// Store-assigned tiebreaker for equal timestamps.
    #[serde(default)]
    pub sequence: u64,
}

impl PendingMessage {
    /// New message with a generated ID, stamped now.
    pub fn new(sender: UserId, recipient: UserId, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: MessageId::generate(),
            sender,
            recipient,
            content: content.into(),
            message_type: MessageType::default(),
            reply_to: None,
            created_at: now,
            expires_at: now,
            status: DeliveryStatus::Sent,
            sequence: 0,
        }
    }

    /// Replace the generated ID.
    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = id;
        self
    }

    /// Set the classification.
    pub fn with_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }

    /// Set the message being replied to.
    pub fn with_reply_to(mut self, reply_to: Option<MessageId>) -> Self {
        self.reply_to = reply_to;
        self
    }

    /// Whether the message is expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
