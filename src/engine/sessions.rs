//! Session manager: the per-device rental timer state machine.
//!
//! Each device moves through Available -> Running -> Paused -> Running ->
//! Stopped(-> Available). No session row exists in the Available state; the
//! `active_sessions` primary key guarantees at most one session per device.
//!
//! Every operation takes `now` as an argument so the arithmetic is
//! deterministic under test; callers pass `Utc::now()`.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::db::{ActiveSession, Device, DeviceStatus, UsageLog};
use crate::DbPool;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Device missing, out of service, or already running a session
    #[error("device is not available")]
    DeviceUnavailable,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

pub struct SessionService {
    db: DbPool,
}

impl SessionService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn get(&self, device_id: &str) -> Result<Option<ActiveSession>, sqlx::Error> {
        sqlx::query_as::<_, ActiveSession>("SELECT * FROM active_sessions WHERE device_id = ?")
            .bind(device_id)
            .fetch_optional(&self.db)
            .await
    }

    pub async fn list(&self) -> Result<Vec<ActiveSession>, sqlx::Error> {
        sqlx::query_as::<_, ActiveSession>(
            "SELECT * FROM active_sessions ORDER BY start_time ASC",
        )
        .fetch_all(&self.db)
        .await
    }

    /// Start a timed session on an available device.
    pub async fn start(
        &self,
        device_id: &str,
        duration_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<ActiveSession, SessionError> {
        let device = sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE id = ?")
            .bind(device_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(SessionError::DeviceUnavailable)?;

        if !device.is_available() {
            return Err(SessionError::DeviceUnavailable);
        }

        if self.get(device_id).await?.is_some() {
            return Err(SessionError::DeviceUnavailable);
        }

        let start_time = now.to_rfc3339();
        let end_time = (now + Duration::minutes(duration_minutes)).to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO active_sessions (device_id, device_name, start_time, duration_minutes, end_time, is_paused, remaining_seconds)
            VALUES (?, ?, ?, ?, ?, 0, NULL)
            "#,
        )
        .bind(device_id)
        .bind(&device.name)
        .bind(&start_time)
        .bind(duration_minutes)
        .bind(&end_time)
        .execute(&self.db)
        .await?;

        self.set_device_status(device_id, DeviceStatus::InUse, now)
            .await?;

        tracing::info!(
            device = %device.name,
            minutes = duration_minutes,
            "Session started"
        );

        Ok(ActiveSession {
            device_id: device_id.to_string(),
            device_name: device.name,
            start_time,
            duration_minutes,
            end_time,
            is_paused: 0,
            remaining_seconds: None,
        })
    }

    /// Stop a session, converting it into a usage log. No-op when no
    /// session exists for the device.
    ///
    /// Actual duration is raw wall-clock elapsed time rounded to whole
    /// minutes, whether or not the session was paused; the paused snapshot
    /// only ever affects the countdown. `completed` compares against the
    /// scheduled end time (stale while paused, by design).
    pub async fn stop(
        &self,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UsageLog>, SessionError> {
        let session = match self.get(device_id).await? {
            Some(s) => s,
            None => return Ok(None),
        };

        let elapsed_secs = match session.start_time() {
            Some(start) => (now - start).num_seconds(),
            None => {
                tracing::warn!(device_id, "Session has malformed start time");
                0
            }
        };
        let actual_minutes = (elapsed_secs as f64 / 60.0).round() as i64;
        let completed = session.end_time().map(|end| now >= end).unwrap_or(false);

        let log = UsageLog {
            id: Uuid::new_v4().to_string(),
            device_id: session.device_id.clone(),
            device_name: session.device_name.clone(),
            start_time: session.start_time.clone(),
            end_time: now.to_rfc3339(),
            duration_minutes: actual_minutes,
            completed: if completed { 1 } else { 0 },
        };

        sqlx::query(
            r#"
            INSERT INTO usage_logs (id, device_id, device_name, start_time, end_time, duration_minutes, completed)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&log.id)
        .bind(&log.device_id)
        .bind(&log.device_name)
        .bind(&log.start_time)
        .bind(&log.end_time)
        .bind(log.duration_minutes)
        .bind(log.completed)
        .execute(&self.db)
        .await?;

        sqlx::query("DELETE FROM active_sessions WHERE device_id = ?")
            .bind(device_id)
            .execute(&self.db)
            .await?;

        self.set_device_status(device_id, DeviceStatus::Available, now)
            .await?;

        tracing::info!(
            device = %log.device_name,
            minutes = actual_minutes,
            completed,
            "Session stopped"
        );

        Ok(Some(log))
    }

    /// Freeze the countdown. No-op when no session exists or it is
    /// already paused. The stored remaining-seconds snapshot becomes
    /// authoritative until resume.
    pub async fn pause(
        &self,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ActiveSession>, SessionError> {
        let session = match self.get(device_id).await? {
            Some(s) if !s.is_paused() => s,
            _ => return Ok(None),
        };

        let remaining = match session.end_time() {
            Some(end) => (end - now).num_seconds().max(0),
            None => 0,
        };

        sqlx::query(
            "UPDATE active_sessions SET is_paused = 1, remaining_seconds = ? WHERE device_id = ?",
        )
        .bind(remaining)
        .bind(device_id)
        .execute(&self.db)
        .await?;

        tracing::info!(device = %session.device_name, remaining, "Session paused");

        self.get(device_id).await.map_err(SessionError::from)
    }

    /// Restart the countdown from the paused snapshot. No-op when no
    /// session exists or it is not paused.
    pub async fn resume(
        &self,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ActiveSession>, SessionError> {
        let session = match self.get(device_id).await? {
            Some(s) if s.is_paused() => s,
            _ => return Ok(None),
        };

        let remaining = session.remaining_seconds.unwrap_or(0).max(0);
        let new_end = (now + Duration::seconds(remaining)).to_rfc3339();

        sqlx::query(
            "UPDATE active_sessions SET is_paused = 0, remaining_seconds = NULL, end_time = ? WHERE device_id = ?",
        )
        .bind(&new_end)
        .bind(device_id)
        .execute(&self.db)
        .await?;

        tracing::info!(device = %session.device_name, "Session resumed");

        self.get(device_id).await.map_err(SessionError::from)
    }

    /// Add minutes to a session. No-op when no session exists. Zero or
    /// negative minutes are accepted without validation.
    pub async fn extend(
        &self,
        device_id: &str,
        additional_minutes: i64,
        _now: DateTime<Utc>,
    ) -> Result<Option<ActiveSession>, SessionError> {
        let session = match self.get(device_id).await? {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_paused() {
            let remaining =
                session.remaining_seconds.unwrap_or(0) + additional_minutes * 60;
            sqlx::query(
                "UPDATE active_sessions SET remaining_seconds = ?, duration_minutes = ? WHERE device_id = ?",
            )
            .bind(remaining)
            .bind(session.duration_minutes + additional_minutes)
            .bind(device_id)
            .execute(&self.db)
            .await?;
        } else {
            let new_end = match session.end_time() {
                Some(end) => end + Duration::minutes(additional_minutes),
                None => return Ok(Some(session)),
            };
            sqlx::query(
                "UPDATE active_sessions SET end_time = ?, duration_minutes = ? WHERE device_id = ?",
            )
            .bind(new_end.to_rfc3339())
            .bind(session.duration_minutes + additional_minutes)
            .bind(device_id)
            .execute(&self.db)
            .await?;
        }

        tracing::info!(
            device = %session.device_name,
            minutes = additional_minutes,
            "Session extended"
        );

        self.get(device_id).await.map_err(SessionError::from)
    }

    /// Force-stop every non-paused session whose scheduled end has passed.
    /// Returns the usage logs produced; each carries `completed = true` by
    /// construction since `now >= end_time` held at stop time.
    pub async fn expire_due(&self, now: DateTime<Utc>) -> Result<Vec<UsageLog>, SessionError> {
        let sessions = self.list().await?;
        let mut logs = Vec::new();

        for session in sessions {
            if session.is_paused() {
                continue;
            }
            let due = match session.end_time() {
                Some(end) => end <= now,
                None => {
                    tracing::warn!(
                        device_id = %session.device_id,
                        "Session has malformed end time, skipping expiry check"
                    );
                    false
                }
            };
            if due {
                if let Some(log) = self.stop(&session.device_id, now).await? {
                    logs.push(log);
                }
            }
        }

        Ok(logs)
    }

    async fn set_device_status(
        &self,
        device_id: &str,
        status: DeviceStatus,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE devices SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now.to_rfc3339())
            .bind(device_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_pool;

    async fn insert_device(pool: &DbPool, id: &str, status: &str) {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO devices (id, name, category, status, default_minutes, created_at, updated_at)
            VALUES (?, ?, 'console', ?, 60, ?, ?)
            "#,
        )
        .bind(id)
        .bind(format!("Device {id}"))
        .bind(status)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn device_status(pool: &DbPool, id: &str) -> String {
        let (status,): (String,) = sqlx::query_as("SELECT status FROM devices WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
            .unwrap();
        status
    }

    #[tokio::test]
    async fn start_marks_device_in_use() {
        let pool = init_test_pool().await;
        insert_device(&pool, "d1", "available").await;
        let svc = SessionService::new(pool.clone());
        let now = Utc::now();

        let session = svc.start("d1", 30, now).await.unwrap();
        assert_eq!(session.duration_minutes, 30);
        assert!(!session.is_paused());
        assert_eq!(device_status(&pool, "d1").await, "inUse");
    }

    #[tokio::test]
    async fn start_fails_on_busy_or_broken_device() {
        let pool = init_test_pool().await;
        insert_device(&pool, "d1", "available").await;
        insert_device(&pool, "d2", "outOfService").await;
        let svc = SessionService::new(pool.clone());
        let now = Utc::now();

        svc.start("d1", 30, now).await.unwrap();
        // Second start on the same device
        assert!(matches!(
            svc.start("d1", 30, now).await,
            Err(SessionError::DeviceUnavailable)
        ));
        // Out-of-service device
        assert!(matches!(
            svc.start("d2", 30, now).await,
            Err(SessionError::DeviceUnavailable)
        ));
        // Unknown device
        assert!(matches!(
            svc.start("nope", 30, now).await,
            Err(SessionError::DeviceUnavailable)
        ));

        // State unchanged: still exactly one session
        assert_eq!(svc.list().await.unwrap().len(), 1);
        assert_eq!(device_status(&pool, "d2").await, "outOfService");
    }

    #[tokio::test]
    async fn at_most_one_session_per_device_over_start_stop_churn() {
        let pool = init_test_pool().await;
        insert_device(&pool, "d1", "available").await;
        let svc = SessionService::new(pool.clone());
        let now = Utc::now();

        for _ in 0..3 {
            svc.start("d1", 10, now).await.unwrap();
            assert!(svc.start("d1", 10, now).await.is_err());
            svc.stop("d1", now + Duration::minutes(1)).await.unwrap();
            assert!(svc.get("d1").await.unwrap().is_none());
        }
        let log_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM usage_logs")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(log_count.0, 3);
    }

    #[tokio::test]
    async fn stop_without_session_is_a_noop() {
        let pool = init_test_pool().await;
        insert_device(&pool, "d1", "available").await;
        let svc = SessionService::new(pool.clone());

        assert!(svc.stop("d1", Utc::now()).await.unwrap().is_none());
        let log_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM usage_logs")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(log_count.0, 0);
    }

    #[tokio::test]
    async fn pause_then_resume_restores_remaining_time() {
        let pool = init_test_pool().await;
        insert_device(&pool, "d1", "available").await;
        let svc = SessionService::new(pool.clone());
        let t0 = Utc::now();

        svc.start("d1", 30, t0).await.unwrap();

        let paused = svc
            .pause("d1", t0 + Duration::minutes(5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(paused.remaining_seconds, Some(25 * 60));

        // Pausing again is a no-op
        assert!(svc
            .pause("d1", t0 + Duration::minutes(6))
            .await
            .unwrap()
            .is_none());

        let resumed = svc
            .resume("d1", t0 + Duration::minutes(10))
            .await
            .unwrap()
            .unwrap();
        assert!(!resumed.is_paused());
        let expected_end = t0 + Duration::minutes(10) + Duration::seconds(25 * 60);
        assert_eq!(resumed.end_time().unwrap(), expected_end);

        // Resuming a running session is a no-op
        assert!(svc
            .resume("d1", t0 + Duration::minutes(11))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn extend_while_paused_adds_to_snapshot_and_duration() {
        let pool = init_test_pool().await;
        insert_device(&pool, "d1", "available").await;
        let svc = SessionService::new(pool.clone());
        let t0 = Utc::now();

        svc.start("d1", 30, t0).await.unwrap();
        svc.pause("d1", t0 + Duration::minutes(5)).await.unwrap();

        let extended = svc
            .extend("d1", 15, t0 + Duration::minutes(6))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(extended.remaining_seconds, Some(25 * 60 + 15 * 60));
        assert_eq!(extended.duration_minutes, 45);

        let resumed = svc
            .resume("d1", t0 + Duration::minutes(10))
            .await
            .unwrap()
            .unwrap();
        let expected_end = t0 + Duration::minutes(10) + Duration::seconds(40 * 60);
        assert_eq!(resumed.end_time().unwrap(), expected_end);
    }

    #[tokio::test]
    async fn extend_while_running_pushes_end_time() {
        let pool = init_test_pool().await;
        insert_device(&pool, "d1", "available").await;
        let svc = SessionService::new(pool.clone());
        let t0 = Utc::now();

        svc.start("d1", 30, t0).await.unwrap();
        let extended = svc
            .extend("d1", 10, t0 + Duration::minutes(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(extended.duration_minutes, 40);
        assert_eq!(extended.end_time().unwrap(), t0 + Duration::minutes(40));

        // Zero-minute extension is accepted and changes nothing material
        let unchanged = svc
            .extend("d1", 0, t0 + Duration::minutes(2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.duration_minutes, 40);
        assert_eq!(unchanged.end_time().unwrap(), t0 + Duration::minutes(40));

        // Extending a nonexistent session is a no-op
        assert!(svc.extend("ghost", 5, t0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn natural_expiry_produces_one_completed_log() {
        let pool = init_test_pool().await;
        insert_device(&pool, "d1", "available").await;
        insert_device(&pool, "d2", "available").await;
        let svc = SessionService::new(pool.clone());
        let t0 = Utc::now();

        svc.start("d1", 30, t0).await.unwrap();
        svc.start("d2", 60, t0).await.unwrap();

        // d2 paused before its end: must never expire
        svc.pause("d2", t0 + Duration::minutes(1)).await.unwrap();

        let logs = svc.expire_due(t0 + Duration::minutes(31)).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].device_id, "d1");
        assert!(logs[0].is_completed());
        assert_eq!(logs[0].duration_minutes, 31);
        assert_eq!(device_status(&pool, "d1").await, "available");

        // Nothing left to expire
        let logs = svc.expire_due(t0 + Duration::minutes(32)).await.unwrap();
        assert!(logs.is_empty());
        assert!(svc.get("d2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn early_stop_logs_not_completed() {
        let pool = init_test_pool().await;
        insert_device(&pool, "d1", "available").await;
        let svc = SessionService::new(pool.clone());
        let t0 = Utc::now();

        svc.start("d1", 30, t0).await.unwrap();
        let log = svc
            .stop("d1", t0 + Duration::minutes(12))
            .await
            .unwrap()
            .unwrap();
        assert!(!log.is_completed());
        assert_eq!(log.duration_minutes, 12);
    }

    // Full timeline from the session manager's contract: start 30 min at T0,
    // pause at T0+5, resume at T0+10, stop at T0+12.
    #[tokio::test]
    async fn pause_resume_stop_timeline() {
        let pool = init_test_pool().await;
        insert_device(&pool, "d1", "available").await;
        let svc = SessionService::new(pool.clone());
        let t0 = Utc::now();

        svc.start("d1", 30, t0).await.unwrap();

        let paused = svc
            .pause("d1", t0 + Duration::minutes(5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(paused.remaining_seconds, Some(1500));

        let resumed = svc
            .resume("d1", t0 + Duration::minutes(10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            resumed.end_time().unwrap(),
            t0 + Duration::minutes(10) + Duration::seconds(1500)
        );

        let log = svc
            .stop("d1", t0 + Duration::minutes(12))
            .await
            .unwrap()
            .unwrap();
        // Stopped before the rescheduled end: ended early
        assert!(!log.is_completed());
        assert_eq!(log.duration_minutes, 12);
        assert_eq!(device_status(&pool, "d1").await, "available");
    }
}
