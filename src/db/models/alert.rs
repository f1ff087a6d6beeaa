//! Operator alert models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// What triggered the alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    SessionExpired,
    ScreenLocked,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::SessionExpired => "session_expired",
            AlertKind::ScreenLocked => "screen_locked",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Alert {
    pub id: String,
    pub kind: String,
    pub device_id: Option<String>,
    pub message: String,
    pub acknowledged: i32,
    pub created_at: String,
}

/// Response DTO for Alert
#[derive(Debug, Clone, Serialize)]
pub struct AlertResponse {
    pub id: String,
    pub kind: String,
    pub device_id: Option<String>,
    pub message: String,
    pub acknowledged: bool,
    pub created_at: String,
}

impl From<Alert> for AlertResponse {
    fn from(alert: Alert) -> Self {
        Self {
            id: alert.id,
            kind: alert.kind,
            device_id: alert.device_id,
            message: alert.message,
            acknowledged: alert.acknowledged != 0,
            created_at: alert.created_at,
        }
    }
}

/// Filter query for listing alerts
#[derive(Debug, Default, Deserialize)]
pub struct AlertQuery {
    /// Only alerts created at or after this RFC 3339 timestamp
    pub since: Option<String>,
    /// Include acknowledged alerts (default: only pending)
    #[serde(default)]
    pub include_acknowledged: bool,
}
