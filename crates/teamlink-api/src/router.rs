//! Route definitions for the TeamLink HTTP API.
//!
//! JSON routes are mounted under `/api`; the WebSocket endpoint is `/ws`.

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::handlers;
use crate::state::AppState;

/// Build the router with every route, threading `AppState` through
/// `.with_state(state)`. Middleware is added by [`crate::app::build_app`].
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(message_routes())
        .merge(presence_routes())
        .merge(health_routes());

    let ws_routes = Router::new().route("/ws", get(handlers::ws::ws_upgrade));

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .with_state(state)
}

/// Send and pending-list endpoints
fn message_routes() -> Router<AppState> {
    Router::new()
        .route("/messages", post(handlers::messages::send_message))
        .route("/messages/pending", get(handlers::messages::pending_messages))
}

/// Presence endpoints
fn presence_routes() -> Router<AppState> {
    Router::new()
        .route("/presence/online", get(handlers::presence::online_users))
        .route("/presence/query", post(handlers::presence::query_presence))
        .route("/presence/status", put(handlers::presence::update_status))
        .route(
            "/presence/availability",
            put(handlers::presence::update_availability),
        )
}

/// Health endpoints
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}
