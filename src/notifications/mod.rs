//! Operator alerts.
//!
//! What the browser app showed as toasts and an alert sound becomes a typed
//! alert record the UI polls, plus a structured log line. Alerts are
//! best-effort: a failed insert is logged and swallowed so it can never take
//! down the operation that raised it.

use chrono::Utc;
use uuid::Uuid;

use crate::db::AlertKind;
use crate::DbPool;

pub struct AlertService {
    db: DbPool,
}

impl AlertService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Record an operator alert. Errors are logged, never propagated.
    pub async fn raise(&self, kind: AlertKind, device_id: Option<&str>, message: &str) {
        let result = sqlx::query(
            r#"
            INSERT INTO alerts (id, kind, device_id, message, acknowledged, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(kind.as_str())
        .bind(device_id)
        .bind(message)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await;

        match result {
            Ok(_) => {
                tracing::info!(kind = %kind, message, "Operator alert raised");
            }
            Err(e) => {
                tracing::error!(kind = %kind, error = %e, "Failed to record alert");
            }
        }
    }
}
