//! Internal events emitted by the realtime subsystem.
//!
//! Events are dispatched through the event bus and consumed by presence
//! broadcasting, audit logging, offline push, and UI badge counters.
//! Subscribers register per [`EventKind`].

pub mod connection;
pub mod delivery;
pub mod presence;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use connection::ConnectionEvent;
pub use delivery::DeliveryEvent;
pub use presence::PresenceEvent;

/// Wrapper for all realtime events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The event payload.
    pub payload: EventPayload,
}

/// Union of all realtime event groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event")]
pub enum EventPayload {
    /// Presence state changes and activity pings.
    Presence(PresenceEvent),
    /// Connection lifecycle.
    Connection(ConnectionEvent),
    /// Message storage and delivery.
    Delivery(DeliveryEvent),
}

/// Discriminant used to subscribe to one event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// [`PresenceEvent::StatusChanged`].
    StatusChanged,
    /// [`PresenceEvent::AvailabilityChanged`].
    AvailabilityChanged,
    /// [`PresenceEvent::ActivityPing`].
    ActivityPing,
    /// [`ConnectionEvent::Opened`].
    ConnectionOpened,
    /// [`ConnectionEvent::Closed`].
    ConnectionClosed,
    /// [`DeliveryEvent::Stored`].
    MessageStored,
    /// [`DeliveryEvent::Delivered`].
    MessageDelivered,
    /// [`DeliveryEvent::Expired`].
    MessagesExpired,
    /// [`DeliveryEvent::AckTimedOut`].
    AckTimedOut,
    /// [`DeliveryEvent::ReceiptReceived`].
    ReceiptReceived,
}

impl RealtimeEvent {
    /// Create a new event stamped with the current time.
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// The kind used for subscription routing.
    pub fn kind(&self) -> EventKind {
        match &self.payload {
            EventPayload::Presence(e) => e.kind(),
            EventPayload::Connection(e) => e.kind(),
            EventPayload::Delivery(e) => e.kind(),
        }
    }
}

impl From<PresenceEvent> for RealtimeEvent {
    fn from(event: PresenceEvent) -> Self {
        Self::new(EventPayload::Presence(event))
    }
}

impl From<ConnectionEvent> for RealtimeEvent {
    fn from(event: ConnectionEvent) -> Self {
        Self::new(EventPayload::Connection(event))
    }
}

impl From<DeliveryEvent> for RealtimeEvent {
    fn from(event: DeliveryEvent) -> Self {
        Self::new(EventPayload::Delivery(event))
    }
}
