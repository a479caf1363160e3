//! JWT token encoding, verification, and claims.

pub mod claims;
pub mod decoder;
pub mod encoder;

pub use claims::Claims;
pub use decoder::JwtVerifier;
pub use encoder::JwtEncoder;
