//! Ack-based delivery with store-and-forward fallback.

pub mod ack;
pub mod protocol;
pub mod request;

pub use ack::{AckOutcome, AckTracker};
pub use protocol::{DeliveryProtocol, DrainReport};
pub use request::{SendOutcome, SendReceipt, SendRequest};
