//! # teamlink-cache
//!
//! Side-store implementations of [`CacheProvider`] for TeamLink. Pending
//! messages are mirrored here so they survive a process restart.
//!
//! - **memory**: In-process store using [moka](https://crates.io/crates/moka)
//! - **redis**: Redis-backed store using the [redis](https://crates.io/crates/redis) crate
//!
//! The provider is selected at runtime based on configuration.
//!
//! [`CacheProvider`]: teamlink_core::traits::CacheProvider

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::CacheManager;
