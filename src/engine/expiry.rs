//! Session expiry monitor.
//!
//! Scans all non-paused sessions on a fixed tick and force-stops any whose
//! scheduled end has passed, through the same stop path manual stops use, so
//! a usage log with `completed = true` is always produced. Raises an
//! operator alert per expiry.

use chrono::Utc;
use tokio::time::{interval, Duration};

use crate::db::AlertKind;
use crate::notifications::AlertService;
use crate::DbPool;

use super::sessions::SessionService;

pub struct ExpiryMonitor {
    sessions: SessionService,
    alerts: AlertService,
    tick_secs: u64,
}

impl ExpiryMonitor {
    pub fn new(db: DbPool, tick_secs: u64) -> Self {
        Self {
            sessions: SessionService::new(db.clone()),
            alerts: AlertService::new(db),
            tick_secs: tick_secs.max(1),
        }
    }

    /// Run one expiry sweep. Returns how many sessions were force-stopped.
    pub async fn check_once(&self) -> usize {
        let now = Utc::now();
        match self.sessions.expire_due(now).await {
            Ok(logs) => {
                for log in &logs {
                    self.alerts
                        .raise(
                            AlertKind::SessionExpired,
                            Some(&log.device_id),
                            &format!("Time's up! Session for {} has ended.", log.device_name),
                        )
                        .await;
                }
                logs.len()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session expiry sweep failed");
                0
            }
        }
    }

    /// Run the monitor loop until the task is aborted at shutdown.
    pub async fn run(self) {
        tracing::info!(tick_secs = self.tick_secs, "Session expiry monitor started");
        let mut ticker = interval(Duration::from_secs(self.tick_secs));
        loop {
            ticker.tick().await;
            self.check_once().await;
        }
    }
}
