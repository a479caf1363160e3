//! # teamlink-api
//!
//! HTTP API layer for TeamLink built on Axum.
//!
//! Provides the `/ws` upgrade endpoint, small JSON endpoints for sending,
//! presence and health, request logging and CORS middleware, the bearer
//! extractor, and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, run_server};
pub use error::ApiError;
pub use state::AppState;
