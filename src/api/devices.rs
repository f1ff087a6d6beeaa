//! Device management endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::db::{now_ts, CreateDeviceRequest, Device, DeviceStatus, UpdateDeviceRequest};
use crate::engine::SessionService;
use crate::AppState;

/// GET /api/devices
pub async fn list_devices(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Device>>, ApiError> {
    let devices = sqlx::query_as::<_, Device>("SELECT * FROM devices ORDER BY name")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(devices))
}

/// GET /api/devices/:id
pub async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Device>, ApiError> {
    let device = sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Device not found"))?;
    Ok(Json(device))
}

/// POST /api/devices
pub async fn create_device(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDeviceRequest>,
) -> Result<(StatusCode, Json<Device>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::validation("Device name is required"));
    }
    if req.default_minutes <= 0 {
        return Err(ApiError::validation("Default minutes must be positive"));
    }

    let now = now_ts();
    let device = Device {
        id: Uuid::new_v4().to_string(),
        name: req.name.trim().to_string(),
        category: req.category,
        external_tag: req.external_tag,
        status: DeviceStatus::Available.as_str().to_string(),
        default_minutes: req.default_minutes,
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO devices (id, name, category, external_tag, status, default_minutes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&device.id)
    .bind(&device.name)
    .bind(&device.category)
    .bind(&device.external_tag)
    .bind(&device.status)
    .bind(device.default_minutes)
    .bind(&device.created_at)
    .bind(&device.updated_at)
    .execute(&state.db)
    .await?;

    info!(name = %device.name, "Device created");

    Ok((StatusCode::CREATED, Json(device)))
}

/// PUT /api/devices/:id
///
/// A status change only toggles between available and out-of-service, and
/// is refused while a session is running on the device.
pub async fn update_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateDeviceRequest>,
) -> Result<Json<Device>, ApiError> {
    let mut device = sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Device not found"))?;

    if let Some(status) = req.status {
        if status == DeviceStatus::InUse {
            return Err(ApiError::validation(
                "Status cannot be set to inUse directly",
            ));
        }
        let sessions = SessionService::new(state.db.clone());
        if sessions.get(&id).await.map_err(ApiError::from)?.is_some() {
            return Err(ApiError::conflict(
                "Cannot change status while a session is active",
            ));
        }
        device.status = status.as_str().to_string();
    }

    if let Some(name) = req.name {
        if name.trim().is_empty() {
            return Err(ApiError::validation("Device name is required"));
        }
        device.name = name.trim().to_string();
    }
    if let Some(category) = req.category {
        device.category = category;
    }
    if let Some(tag) = req.external_tag {
        device.external_tag = Some(tag);
    }
    if let Some(minutes) = req.default_minutes {
        if minutes <= 0 {
            return Err(ApiError::validation("Default minutes must be positive"));
        }
        device.default_minutes = minutes;
    }
    device.updated_at = now_ts();

    sqlx::query(
        r#"
        UPDATE devices
        SET name = ?, category = ?, external_tag = ?, status = ?, default_minutes = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&device.name)
    .bind(&device.category)
    .bind(&device.external_tag)
    .bind(&device.status)
    .bind(device.default_minutes)
    .bind(&device.updated_at)
    .bind(&device.id)
    .execute(&state.db)
    .await?;

    Ok(Json(device))
}

/// DELETE /api/devices/:id
///
/// A running session is stopped (and logged) before the device goes away.
pub async fn delete_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let device = sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Device not found"))?;

    let sessions = SessionService::new(state.db.clone());
    sessions.stop(&id, Utc::now()).await?;

    sqlx::query("DELETE FROM devices WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    info!(name = %device.name, "Device deleted");

    Ok(StatusCode::NO_CONTENT)
}
