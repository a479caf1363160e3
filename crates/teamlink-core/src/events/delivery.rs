//! Message storage and delivery events.

use serde::{Deserialize, Serialize};

use super::EventKind;
use crate::types::{DeliveryStatus, MessageId, UserId};

/// Events related to message delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DeliveryEvent {
    /// A message was put in (or overwritten in) the pending store.
    Stored {
        /// Message ID.
        message_id: MessageId,
        /// Recipient.
        recipient: UserId,
    },
    /// A message was acknowledged and left the pending path.
    Delivered {
        /// Message ID.
        message_id: MessageId,
        /// Recipient.
        recipient: UserId,
    },
    /// The expiry sweep discarded messages.
    Expired {
        /// Number of messages removed.
        count: usize,
    },
    /// A transmitted frame was not acknowledged in time.
    AckTimedOut {
        /// Message ID.
        message_id: MessageId,
        /// Recipient.
        recipient: UserId,
    },
    /// A recipient reported Delivered/Read for a message.
    ReceiptReceived {
        /// Message ID.
        message_id: MessageId,
        /// Recipient who sent the receipt.
        from: UserId,
        /// Reported status.
        status: DeliveryStatus,
    },
}

impl DeliveryEvent {
    /// Subscription kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Stored { .. } => EventKind::MessageStored,
            Self::Delivered { .. } => EventKind::MessageDelivered,
            Self::Expired { .. } => EventKind::MessagesExpired,
            Self::AckTimedOut { .. } => EventKind::AckTimedOut,
            Self::ReceiptReceived { .. } => EventKind::ReceiptReceived,
        }
    }
}
