//! # teamlink-realtime
//!
//! Presence-aware real-time message delivery for TeamLink. Provides:
//!
//! - An in-process event bus with sync and async subscribers
//! - User presence tracking (online/away/busy/dnd/offline)
//! - A connection registry with per-user fan-out and named groups
//! - A pending-message store with expiry and an optional cache mirror
//! - Ack-based delivery with store-and-forward for unreachable users

pub mod bus;
pub mod connection;
pub mod delivery;
pub mod message;
pub mod metrics;
pub mod presence;
pub mod server;
pub mod store;
pub mod task;

pub use bus::EventBus;
pub use connection::registry::ConnectionRegistry;
pub use delivery::DeliveryProtocol;
pub use presence::tracker::PresenceTracker;
pub use server::{EngineStats, RealtimeEngine};
pub use store::MessageStore;
