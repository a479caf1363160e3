//! Collaborator traits defined in `teamlink-core` and implemented by other crates.

pub mod auth;
pub mod cache;

pub use auth::{Identity, TokenVerification, TokenVerifier};
pub use cache::CacheProvider;
