//! Application builder: wires router + middleware + state into an Axum app,
//! and runs the server with its background sweeps.

use std::sync::Arc;

use axum::Router;
use axum::middleware as axum_middleware;
use tower_http::trace::TraceLayer;

use teamlink_auth::JwtVerifier;
use teamlink_cache::CacheManager;
use teamlink_core::config::AppConfig;
use teamlink_core::error::{AppError, ErrorKind};
use teamlink_core::traits::auth::TokenVerifier;
use teamlink_core::traits::cache::CacheProvider;
use teamlink_realtime::RealtimeEngine;
use teamlink_worker::{CronScheduler, SweepSchedule, builtin_executor};

use crate::middleware::cors::build_cors_layer;
use crate::middleware::logging::request_logging;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server);
    build_router(state)
        .layer(axum_middleware::from_fn(request_logging))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Runs the TeamLink server until Ctrl-C.
pub async fn run_server(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting TeamLink server...");
    let config = Arc::new(config);

    // ── Step 1: Side-store ───────────────────────────────────────
    let cache = init_side_store(&config).await;

    // ── Step 2: Token verification ───────────────────────────────
    let verifier: Arc<dyn TokenVerifier> = Arc::new(JwtVerifier::new(&config.auth));

    // ── Step 3: Realtime engine ──────────────────────────────────
    let engine = Arc::new(RealtimeEngine::new(&config, cache.clone()));
    match engine.restore().await {
        Ok(restored) => tracing::info!(restored, "Pending messages restored"),
        Err(e) => tracing::warn!(error = %e, "Could not restore pending messages"),
    }

    // ── Step 4: Background sweeps ────────────────────────────────
    let mut scheduler = CronScheduler::new(Arc::new(builtin_executor(&engine))).await?;
    scheduler
        .register_default_tasks(&SweepSchedule::from_config(&config))
        .await?;
    scheduler.start().await?;

    // ── Step 5: HTTP server ──────────────────────────────────────
    let state = AppState::new(Arc::clone(&config), cache, verifier, Arc::clone(&engine));
    let app = build_app(state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Io, format!("Failed to bind {addr}"), e))?;

    tracing::info!(addr = %addr, "TeamLink server listening");

    let shutdown_engine = Arc::clone(&engine);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            if let Err(e) = shutdown_engine.shutdown().await {
                tracing::error!(error = %e, "Engine shutdown failed");
            }
        })
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Io, "Server error", e))?;

    scheduler.shutdown().await?;
    tracing::info!("TeamLink server stopped");
    Ok(())
}

/// The side-store used to mirror pending messages, if mirroring is enabled.
///
/// An unreachable store is logged and the engine runs memory-only.
async fn init_side_store(config: &AppConfig) -> Option<Arc<dyn CacheProvider>> {
    if !config.delivery.persist_pending {
        tracing::info!("Pending-message mirroring disabled");
        return None;
    }

    tracing::info!(provider = %config.cache.provider, "Initializing side-store");
    match CacheManager::new(&config.cache).await {
        Ok(cache) => Some(Arc::new(cache)),
        Err(e) => {
            tracing::warn!(error = %e, "Side-store unavailable; pending messages stay in memory");
            None
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
