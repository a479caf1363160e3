//! Pending-message store with TTL expiry and optional side-store mirror.

pub mod message_store;
pub mod pending;
pub mod persistence;

pub use message_store::MessageStore;
pub use pending::PendingMessage;
pub use persistence::PendingMirror;
