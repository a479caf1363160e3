//! Message classification and delivery status.

use serde::{Deserialize, Serialize};

/// Kind of message carried by the delivery protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// User-to-user chat.
    #[default]
    Chat,
    /// Generated by the system (workflow updates, etc.).
    System,
    /// Notification-style message.
    Notification,
}

/// Application-level delivery state of a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryStatus {
    /// Accepted by the server.
    #[default]
    Sent,
    /// Recipient client confirmed delivery.
    Delivered,
    /// Recipient client confirmed the user read it.
    Read,
}

impl DeliveryStatus {
    /// Whether this status confirms the message reached the recipient.
    pub fn confirms_delivery(&self) -> bool {
        matches!(self, Self::Delivered | Self::Read)
    }
}
