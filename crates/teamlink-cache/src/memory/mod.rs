//! In-memory side store.

pub mod store;

pub use store::MemoryCacheProvider;
