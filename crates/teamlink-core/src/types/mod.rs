//! Shared domain types.

pub mod id;
pub mod message;
pub mod presence;

pub use id::{ConnectionId, MessageId, UserId};
pub use message::{DeliveryStatus, MessageType};
pub use presence::PresenceStatus;
