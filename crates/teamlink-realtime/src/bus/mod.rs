//! Process-wide publish/subscribe for typed realtime events.

pub mod event_bus;

pub use event_bus::{EventBus, SubscriptionId};
