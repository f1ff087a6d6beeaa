//! Session lifecycle endpoints.
//!
//! Sessions are addressed by the device they run on; a device carries at
//! most one active session at a time.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::db::{
    Device, ExtendSessionRequest, SessionResponse, StartSessionRequest, UsageLog,
    UsageLogResponse,
};
use crate::engine::SessionService;
use crate::AppState;

/// GET /api/sessions
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SessionResponse>>, ApiError> {
    let now = Utc::now();
    let sessions = SessionService::new(state.db.clone()).list().await?;
    Ok(Json(
        sessions
            .into_iter()
            .map(|s| SessionResponse::from_session(s, now))
            .collect(),
    ))
}

/// GET /api/devices/:id/session
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = SessionService::new(state.db.clone())
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("No active session for this device"))?;
    Ok(Json(SessionResponse::from_session(session, Utc::now())))
}

/// POST /api/devices/:id/session
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let duration = match req.duration_minutes {
        Some(minutes) => {
            if minutes <= 0 {
                return Err(ApiError::validation("Duration must be positive"));
            }
            minutes
        }
        None => {
            let device = sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE id = ?")
                .bind(&id)
                .fetch_optional(&state.db)
                .await?
                .ok_or_else(|| ApiError::not_found("Device not found"))?;
            device.default_minutes
        }
    };

    let now = Utc::now();
    let session = SessionService::new(state.db.clone())
        .start(&id, duration, now)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse::from_session(session, now)),
    ))
}

/// The no-op answer for pause/resume/extend: the session as it stands,
/// or 204 when the device has none. Timer controls never error.
async fn current_session_response(
    state: &AppState,
    device_id: &str,
    now: DateTime<Utc>,
) -> Result<Response, ApiError> {
    match SessionService::new(state.db.clone()).get(device_id).await? {
        Some(session) => Ok(Json(SessionResponse::from_session(session, now)).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// DELETE /api/devices/:id/session
pub async fn stop_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    match SessionService::new(state.db.clone()).stop(&id, Utc::now()).await? {
        Some(log) => Ok(Json(UsageLogResponse::from(log)).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// POST /api/devices/:id/session/pause
pub async fn pause_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    match SessionService::new(state.db.clone()).pause(&id, now).await? {
        Some(session) => Ok(Json(SessionResponse::from_session(session, now)).into_response()),
        None => current_session_response(&state, &id, now).await,
    }
}

/// POST /api/devices/:id/session/resume
pub async fn resume_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    match SessionService::new(state.db.clone()).resume(&id, now).await? {
        Some(session) => Ok(Json(SessionResponse::from_session(session, now)).into_response()),
        None => current_session_response(&state, &id, now).await,
    }
}

/// POST /api/devices/:id/session/extend
pub async fn extend_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ExtendSessionRequest>,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    match SessionService::new(state.db.clone())
        .extend(&id, req.additional_minutes, now)
        .await?
    {
        Some(session) => Ok(Json(SessionResponse::from_session(session, now)).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// GET /api/usage-logs
pub async fn list_usage_logs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UsageLogResponse>>, ApiError> {
    let logs = sqlx::query_as::<_, UsageLog>(
        "SELECT * FROM usage_logs ORDER BY end_time DESC LIMIT 500",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(logs.into_iter().map(UsageLogResponse::from).collect()))
}
