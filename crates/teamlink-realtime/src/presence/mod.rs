//! User presence tracking.

pub mod record;
pub mod tracker;

pub use record::PresenceRecord;
pub use tracker::PresenceTracker;
