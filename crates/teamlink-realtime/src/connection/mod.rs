//! Connection management: lifecycle, pool, groups, handles, heartbeat, auth.

pub mod authenticator;
pub mod groups;
pub mod handle;
pub mod heartbeat;
pub mod pool;
pub mod registry;

pub use authenticator::WsAuthenticator;
pub use handle::{ConnectionHandle, ConnectionInfo, SendFailure};
pub use registry::ConnectionRegistry;
