//! Send requests and their outcomes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use teamlink_core::types::{MessageId, MessageType, UserId};

use crate::store::PendingMessage;

/// Prefix addressing a named group instead of a user.
pub const GROUP_PREFIX: &str = "group:";

/// Where a send is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// One user, all of their connections.
    User(UserId),
    /// Members of a named group.
    Group(String),
    /// Every live connection.
    Broadcast,
}

/// A message send.
#[derive(Debug, Clone)]
pub struct SendRequest {
    /// Caller-chosen ID; generated when absent.
    pub id: Option<MessageId>,
    /// Sender.
    pub from: UserId,
    /// Recipient user, `group:<name>`, or `*`.
    pub to: UserId,
    /// Message body.
    pub content: String,
    /// Classification.
    pub message_type: MessageType,
    /// Wait for the recipient's ack.
    pub requires_ack: bool,
    /// Store for later delivery when the recipient cannot be reached.
    pub queue_if_offline: bool,
    /// Message being replied to.
    pub reply_to: Option<MessageId>,
    /// Pending lifetime; the configured default when absent.
    pub ttl: Option<Duration>,
}

impl SendRequest {
    /// Acked, queue-if-offline chat message.
    pub fn new(from: UserId, to: UserId, content: impl Into<String>) -> Self {
        Self {
            id: None,
            from,
            to,
            content: content.into(),
            message_type: MessageType::Chat,
            requires_ack: true,
            queue_if_offline: true,
            reply_to: None,
            ttl: None,
        }
    }

    /// Set the message ID.
    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set whether an ack is required.
    pub fn requires_ack(mut self, requires_ack: bool) -> Self {
        self.requires_ack = requires_ack;
        self
    }

    /// Set whether to queue for an unreachable recipient.
    pub fn queue_if_offline(mut self, queue: bool) -> Self {
        self.queue_if_offline = queue;
        self
    }

    /// Set the pending TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the classification.
    pub fn with_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }

    /// Resolve the addressing.
    pub fn target(&self) -> Target {
        if self.to.is_broadcast() {
            Target::Broadcast
        } else if let Some(group) = self.to.as_str().strip_prefix(GROUP_PREFIX) {
            Target::Group(group.to_string())
        } else {
            Target::User(self.to.clone())
        }
    }

    /// The message record this request describes.
    pub fn to_pending(&self) -> PendingMessage {
        let message = PendingMessage::new(self.from.clone(), self.to.clone(), self.content.clone())
            .with_type(self.message_type)
            .with_reply_to(self.reply_to.clone());
        match &self.id {
            Some(id) if !id.is_blank() => message.with_id(id.clone()),
            _ => message,
        }
    }
}

/// Final state of a send from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendOutcome {
    /// The recipient acknowledged the frame.
    Delivered,
    /// Queued on at least one connection; no ack was requested.
    Transmitted,
    /// Stored for delivery on the recipient's next connection.
    StoredPending,
    /// Recipient unreachable and queueing was not requested.
    Dropped,
}

impl SendOutcome {
    /// Wire name of the outcome.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Transmitted => "transmitted",
            Self::StoredPending => "stored_pending",
            Self::Dropped => "dropped",
        }
    }
}

/// Result of a send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    /// Message ID.
    pub message_id: MessageId,
    /// Outcome.
    pub outcome: SendOutcome,
    /// Connections the frame was queued on.
    pub reached: usize,
}
