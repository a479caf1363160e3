//! Builder helpers for constructing outbound frames.

use chrono::Utc;

use teamlink_core::error::AppError;
use teamlink_core::types::{DeliveryStatus, MessageId, UserId};

use super::types::OutboundMessage;
use crate::presence::PresenceRecord;

/// Build an error frame
pub fn build_error(code: &str, message: &str) -> OutboundMessage {
    OutboundMessage::Error {
        code: code.to_string(),
        message: message.to_string(),
    }
}

/// Build an error frame from an application error
pub fn build_app_error(err: &AppError) -> OutboundMessage {
    build_error(&err.kind.to_string(), &err.message)
}

/// Build a presence frame from a user's record
pub fn build_presence(record: &PresenceRecord) -> OutboundMessage {
    OutboundMessage::Presence {
        user_id: record.user_id.clone(),
        status: record.status,
        message: record.status_message.clone(),
        is_available: record.is_available_for_chat,
        timestamp: Utc::now(),
    }
}

/// Build a receipt frame forwarded to the original sender
pub fn build_receipt(id: MessageId, from: UserId, status: DeliveryStatus) -> OutboundMessage {
    OutboundMessage::Receipt {
        id,
        from,
        status,
        timestamp: Utc::now(),
    }
}

/// Build a heartbeat ping
pub fn build_ping() -> OutboundMessage {
    OutboundMessage::Ping {
        timestamp: Utc::now().timestamp_millis(),
    }
}
