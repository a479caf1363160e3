//! Presence query and update handlers.

use axum::Json;
use axum::extract::State;

use teamlink_core::error::AppError;
use teamlink_core::types::PresenceStatus;
use teamlink_realtime::presence::PresenceRecord;

use crate::dto::request::{PresenceQueryRequest, UpdateAvailabilityRequest, UpdateStatusRequest};
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// Upper bound on users per presence query.
const MAX_QUERY_USERS: usize = 500;

/// GET /api/presence/online
pub async fn online_users(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Json<ApiResponse<Vec<PresenceRecord>>> {
    Json(ApiResponse::ok(state.engine.presence.get_online_users()))
}

/// POST /api/presence/query
pub async fn query_presence(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(body): Json<PresenceQueryRequest>,
) -> Result<Json<ApiResponse<Vec<PresenceRecord>>>, ApiError> {
    if body.user_ids.len() > MAX_QUERY_USERS {
        return Err(AppError::validation(format!(
            "At most {MAX_QUERY_USERS} users per query"
        ))
        .into());
    }
    let records = state.engine.presence.get_users_presence(&body.user_ids);
    Ok(Json(ApiResponse::ok(records)))
}

/// PUT /api/presence/status
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<PresenceRecord>>, ApiError> {
    let status = PresenceStatus::parse(&body.status).ok_or_else(|| {
        AppError::validation(format!("Unknown presence status '{}'", body.status))
    })?;
    let record = state
        .engine
        .presence
        .update_status(&user.user_id, status, body.message);
    Ok(Json(ApiResponse::ok(record)))
}

/// PUT /api/presence/availability
pub async fn update_availability(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<UpdateAvailabilityRequest>,
) -> Json<ApiResponse<PresenceRecord>> {
    let record = state
        .engine
        .presence
        .set_availability_for_chat(&user.user_id, body.is_available);
    Json(ApiResponse::ok(record))
}
