//! WebSocket frame types, framing, validation, and serialization.

pub mod builder;
pub mod envelope;
pub mod serializer;
pub mod types;
pub mod validator;

pub use envelope::DeliveryEnvelope;
pub use types::{InboundMessage, OutboundMessage};
