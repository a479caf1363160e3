//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use teamlink_core::config::AppConfig;
use teamlink_core::traits::auth::TokenVerifier;
use teamlink_core::traits::cache::CacheProvider;
use teamlink_realtime::RealtimeEngine;
use teamlink_realtime::connection::WsAuthenticator;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Side-store, when one is configured
    pub cache: Option<Arc<dyn CacheProvider>>,
    /// Bearer-token authenticator shared by `/ws` and the JSON endpoints
    pub authenticator: WsAuthenticator,
    /// Real-time delivery engine
    pub engine: Arc<RealtimeEngine>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Assemble the state from already-built components.
    pub fn new(
        config: Arc<AppConfig>,
        cache: Option<Arc<dyn CacheProvider>>,
        verifier: Arc<dyn TokenVerifier>,
        engine: Arc<RealtimeEngine>,
    ) -> Self {
        Self {
            config,
            cache,
            authenticator: WsAuthenticator::new(verifier),
            engine,
            started_at: Instant::now(),
        }
    }
}
