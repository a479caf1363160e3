//! # teamlink-auth
//!
//! JWT implementation of the token verification collaborator consumed by
//! the WebSocket upgrade endpoint and the HTTP API.
//!
//! - `jwt`: claims, signing (for tooling and tests), and verification

pub mod jwt;

pub use jwt::{Claims, JwtEncoder, JwtVerifier};
