//! PIN screen lock endpoints and the guard middleware.
//!
//! The PIN is stored as a SHA-256 digest in the settings table. While a PIN
//! is set and the screen is locked, every endpoint outside this module
//! answers 423 Locked. When no PIN has been configured the guard is
//! disabled entirely.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::info;

use crate::api::error::ApiError;
use crate::db::{now_ts, AlertKind, DbPool};
use crate::notifications::AlertService;
use crate::AppState;

const PIN_DIGEST_KEY: &str = "pin_digest";

pub fn hash_pin(pin: &str) -> String {
    hex::encode(Sha256::digest(pin.as_bytes()))
}

/// Constant-time comparison of a candidate PIN against the stored digest.
fn verify_pin(pin: &str, stored_digest: &str) -> bool {
    hash_pin(pin).as_bytes().ct_eq(stored_digest.as_bytes()).into()
}

pub async fn load_pin_digest(db: &DbPool) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(PIN_DIGEST_KEY)
        .fetch_optional(db)
        .await?;
    Ok(row.map(|(value,)| value))
}

async fn store_pin_digest(db: &DbPool, digest: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(PIN_DIGEST_KEY)
    .bind(digest)
    .bind(now_ts())
    .execute(db)
    .await?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct GuardStatus {
    pub pin_set: bool,
    pub locked: bool,
}

#[derive(Debug, Deserialize)]
pub struct UnlockRequest {
    pub pin: String,
}

#[derive(Debug, Deserialize)]
pub struct SetPinRequest {
    #[serde(default)]
    pub current_pin: Option<String>,
    pub new_pin: String,
}

/// GET /api/guard/status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<GuardStatus> {
    Json(GuardStatus {
        pin_set: state.guard.is_enabled(),
        locked: state.guard.is_locked(),
    })
}

/// POST /api/guard/unlock
pub async fn unlock(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UnlockRequest>,
) -> Result<Json<GuardStatus>, ApiError> {
    let digest = load_pin_digest(&state.db)
        .await?
        .ok_or_else(|| ApiError::bad_request("No PIN has been configured"))?;

    if !verify_pin(&req.pin, &digest) {
        return Err(ApiError::unauthorized("Incorrect PIN"));
    }

    state.guard.unlock(Utc::now());
    info!("Screen unlocked");

    Ok(Json(GuardStatus {
        pin_set: true,
        locked: false,
    }))
}

/// POST /api/guard/lock
pub async fn lock(State(state): State<Arc<AppState>>) -> Result<Json<GuardStatus>, ApiError> {
    if !state.guard.is_enabled() {
        return Err(ApiError::bad_request("No PIN has been configured"));
    }

    if state.guard.lock() {
        info!("Screen locked manually");
        AlertService::new(state.db.clone())
            .raise(AlertKind::ScreenLocked, None, "The application has been locked")
            .await;
    }

    Ok(Json(GuardStatus {
        pin_set: true,
        locked: true,
    }))
}

/// PUT /api/guard/pin
///
/// Sets the PIN on first use; changing an existing PIN requires the
/// current one.
pub async fn set_pin(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetPinRequest>,
) -> Result<Json<GuardStatus>, ApiError> {
    if req.new_pin.len() < 4 || !req.new_pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::validation("PIN must be at least 4 digits"));
    }

    if let Some(digest) = load_pin_digest(&state.db).await? {
        let current = req
            .current_pin
            .as_deref()
            .ok_or_else(|| ApiError::unauthorized("Current PIN is required"))?;
        if !verify_pin(current, &digest) {
            return Err(ApiError::unauthorized("Incorrect PIN"));
        }
    }

    store_pin_digest(&state.db, &hash_pin(&req.new_pin)).await?;
    state.guard.set_enabled(true);
    state.guard.touch(Utc::now());
    info!("PIN updated");

    Ok(Json(GuardStatus {
        pin_set: true,
        locked: state.guard.is_locked(),
    }))
}

/// Middleware over the protected routes: stamps operator activity and
/// rejects requests while the screen is locked.
pub async fn guard_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if state.guard.is_enabled() {
        if state.guard.is_locked() {
            return Err(ApiError::locked("Screen is locked"));
        }
        state.guard.touch(Utc::now());
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_pool;

    #[test]
    fn pin_digest_round_trip() {
        let digest = hash_pin("1234");
        assert_eq!(digest.len(), 64);
        assert!(verify_pin("1234", &digest));
        assert!(!verify_pin("1235", &digest));
        assert!(!verify_pin("12345", &digest));
    }

    #[test]
    fn near_miss_pins_do_not_verify() {
        let digest = hash_pin("0000");
        assert!(!verify_pin("000", &digest));
        assert!(!verify_pin("00000", &digest));
        assert!(verify_pin("0000", &digest));
    }

    #[tokio::test]
    async fn digest_storage_overwrites_previous_value() {
        let pool = init_test_pool().await;
        assert!(load_pin_digest(&pool).await.unwrap().is_none());

        store_pin_digest(&pool, &hash_pin("1234")).await.unwrap();
        let first = load_pin_digest(&pool).await.unwrap().unwrap();
        assert!(verify_pin("1234", &first));

        store_pin_digest(&pool, &hash_pin("9876")).await.unwrap();
        let second = load_pin_digest(&pool).await.unwrap().unwrap();
        assert!(verify_pin("9876", &second));
        assert!(!verify_pin("1234", &second));
    }
}
