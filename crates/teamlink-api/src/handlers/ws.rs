//! WebSocket upgrade handler.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use teamlink_core::traits::auth::Identity;
use teamlink_realtime::message::serializer::serialize_outbound;

use crate::dto::request::WsQuery;
use crate::error::ApiError;
use crate::extractors::bearer_token;
use crate::state::AppState;

/// GET /ws?token={jwt}: WebSocket upgrade
///
/// The token may also come as an `Authorization: Bearer` header. It is
/// verified before the upgrade; a bad token gets a plain 401.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let token = query.token.as_deref().or_else(|| bearer_token(&headers));
    let identity = match state.authenticator.authenticate(token).await {
        Ok(identity) => identity,
        Err(e) => {
            debug!(error = %e, "WebSocket upgrade rejected");
            return ApiError(e).into_response();
        }
    };

    match ws {
        Ok(ws) => ws
            .max_message_size(state.config.realtime.max_frame_bytes)
            .on_upgrade(move |socket| handle_ws_connection(state, identity, socket)),
        Err(rejection) => rejection.into_response(),
    }
}

/// Serves one established connection until either side closes it.
async fn handle_ws_connection(state: AppState, identity: Identity, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let engine = Arc::clone(&state.engine);

    let (handle, mut outbound_rx) = engine.connect(&identity);
    let conn_id = handle.id.clone();
    let heartbeat = engine.spawn_heartbeat(Arc::clone(&handle));
    let mut shutdown = engine.shutdown_receiver();

    info!(
        conn_id = %conn_id,
        user_id = %identity.user_id,
        "WebSocket connection established"
    );

    // Outbound forwarder
    let writer_conn = conn_id.clone();
    let mut outbound_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            let text = match serialize_outbound(&frame) {
                Ok(text) => text,
                Err(e) => {
                    warn!(conn_id = %writer_conn, error = %e, "Dropping unserializable frame");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let mut liveness = tokio::time::interval(
        state
            .config
            .realtime
            .ping_interval()
            .max(Duration::from_secs(1)),
    );
    loop {
        tokio::select! {
            incoming = ws_rx.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    engine.handle_inbound(&conn_id, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                // Transport-level ping/pong is answered by axum.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            },
            _ = &mut outbound_task => break,
            _ = liveness.tick() => {
                if !handle.is_alive() {
                    break;
                }
            }
            _ = shutdown.recv() => break,
        }
    }

    heartbeat.abort();
    engine.disconnect(&conn_id);
    outbound_task.abort();

    info!(
        conn_id = %conn_id,
        user_id = %identity.user_id,
        "WebSocket connection closed"
    );
}
