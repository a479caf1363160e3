//! # teamlink-core
//!
//! Core crate for TeamLink. Contains configuration schemas, typed
//! identifiers, presence and delivery enums, the realtime event type,
//! collaborator traits, and the unified error system.
//!
//! This crate has **no** internal dependencies on other TeamLink crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
