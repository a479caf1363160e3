//! Message send and pending-list handlers.

use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use teamlink_core::types::UserId;
use teamlink_realtime::delivery::{SendReceipt, SendRequest};
use teamlink_realtime::message::validator::validate_message;
use teamlink_realtime::store::PendingMessage;

use crate::dto::request::SendMessageRequest;
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/messages: send as the bearer identity.
///
/// Returns once the outcome is known, which for acked sends to a live
/// recipient may take up to the ack timeout.
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SendReceipt>>), ApiError> {
    validate_message(user.user_id.as_str(), &body.to, &body.content)?;

    let mut request = SendRequest::new(user.user_id.clone(), UserId::new(body.to), body.content)
        .with_type(body.message_type)
        .requires_ack(body.requires_ack.unwrap_or(true))
        .queue_if_offline(
            body.queue_if_offline
                .unwrap_or(state.config.delivery.queue_if_offline_default),
        );
    if let Some(id) = body.id {
        request = request.with_id(id);
    }
    if let Some(ttl) = body.ttl_seconds {
        request = request.with_ttl(Duration::from_secs(ttl));
    }
    request.reply_to = body.reply_to;

    let receipt = state.engine.send(request).await?;
    Ok((StatusCode::ACCEPTED, Json(ApiResponse::ok(receipt))))
}

/// GET /api/messages/pending: the caller's undelivered messages, oldest first.
pub async fn pending_messages(
    State(state): State<AppState>,
    user: AuthUser,
) -> Json<ApiResponse<Vec<PendingMessage>>> {
    let pending = state.engine.store.get_pending_messages_for_user(&user.user_id);
    Json(ApiResponse::ok(pending))
}
