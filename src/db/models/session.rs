//! Active session and usage log models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::common::parse_ts;

/// A running (or paused) rental session. One row per device at most,
/// enforced by the primary key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActiveSession {
    pub device_id: String,
    pub device_name: String,
    pub start_time: String,
    pub duration_minutes: i64,
    pub end_time: String,
    pub is_paused: i32,
    pub remaining_seconds: Option<i64>,
}

impl ActiveSession {
    pub fn is_paused(&self) -> bool {
        self.is_paused != 0
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        parse_ts(&self.start_time)
    }

    /// Scheduled end. Stale while the session is paused; the stored
    /// remaining-seconds snapshot is authoritative then.
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        parse_ts(&self.end_time)
    }

    /// Seconds left on the countdown at `now`, clamped to zero.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> i64 {
        if self.is_paused() {
            return self.remaining_seconds.unwrap_or(0).max(0);
        }
        match self.end_time() {
            Some(end) => (end - now).num_seconds().max(0),
            None => 0,
        }
    }
}

/// Response DTO for an active session, with the countdown resolved
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub device_id: String,
    pub device_name: String,
    pub start_time: String,
    pub duration_minutes: i64,
    pub end_time: String,
    pub is_paused: bool,
    pub remaining_seconds: i64,
}

impl SessionResponse {
    pub fn from_session(session: ActiveSession, now: DateTime<Utc>) -> Self {
        let remaining_seconds = session.remaining_at(now);
        Self {
            device_id: session.device_id,
            device_name: session.device_name,
            start_time: session.start_time,
            duration_minutes: session.duration_minutes,
            end_time: session.end_time,
            is_paused: session.is_paused != 0,
            remaining_seconds,
        }
    }
}

/// Immutable record of a finished session
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UsageLog {
    pub id: String,
    pub device_id: String,
    pub device_name: String,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: i64,
    pub completed: i32,
}

impl UsageLog {
    /// Whether the session ran to its scheduled end rather than being cut short
    pub fn is_completed(&self) -> bool {
        self.completed != 0
    }
}

/// Response DTO for UsageLog
#[derive(Debug, Clone, Serialize)]
pub struct UsageLogResponse {
    pub id: String,
    pub device_id: String,
    pub device_name: String,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: i64,
    pub completed: bool,
}

impl From<UsageLog> for UsageLogResponse {
    fn from(log: UsageLog) -> Self {
        Self {
            id: log.id,
            device_id: log.device_id,
            device_name: log.device_name,
            start_time: log.start_time,
            end_time: log.end_time,
            duration_minutes: log.duration_minutes,
            completed: log.completed != 0,
        }
    }
}

/// Request to start a session. Duration falls back to the device's
/// default when omitted.
#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    #[serde(default)]
    pub duration_minutes: Option<i64>,
}

/// Request to extend a session
#[derive(Debug, Deserialize)]
pub struct ExtendSessionRequest {
    pub additional_minutes: i64,
}
