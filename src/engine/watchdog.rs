//! Screen lock state and the inactivity watchdog.
//!
//! Every authenticated request stamps the guard's last-activity time; the
//! watchdog checks on a fixed interval and locks the screen once the
//! operator has been idle past the configured timeout. While no PIN is set
//! the guard is disabled and never locks.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{interval, Duration};

use crate::db::AlertKind;
use crate::notifications::AlertService;

#[derive(Debug)]
struct GuardInner {
    locked: bool,
    last_activity: DateTime<Utc>,
}

/// Shared lock state for the PIN gate.
#[derive(Debug)]
pub struct ScreenGuard {
    enabled: AtomicBool,
    inner: Mutex<GuardInner>,
}

impl ScreenGuard {
    /// A guard starts locked when a PIN exists, open otherwise.
    pub fn new(pin_set: bool, now: DateTime<Utc>) -> Self {
        Self {
            enabled: AtomicBool::new(pin_set),
            inner: Mutex::new(GuardInner {
                locked: pin_set,
                last_activity: now,
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Called when the PIN is first set or cleared.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
        if !enabled {
            self.inner.lock().locked = false;
        }
    }

    pub fn is_locked(&self) -> bool {
        self.inner.lock().locked
    }

    /// Record operator activity, pushing the idle deadline out.
    pub fn touch(&self, now: DateTime<Utc>) {
        self.inner.lock().last_activity = now;
    }

    pub fn lock(&self) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let mut inner = self.inner.lock();
        let was_unlocked = !inner.locked;
        inner.locked = true;
        was_unlocked
    }

    pub fn unlock(&self, now: DateTime<Utc>) {
        let mut inner = self.inner.lock();
        inner.locked = false;
        inner.last_activity = now;
    }

    /// Whether the idle timeout has elapsed on an unlocked, enabled guard.
    pub fn idle_expired(&self, now: DateTime<Utc>, timeout: ChronoDuration) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let inner = self.inner.lock();
        !inner.locked && now - inner.last_activity > timeout
    }
}

/// Periodic inactivity check that locks the screen.
pub struct InactivityWatchdog {
    guard: Arc<ScreenGuard>,
    alerts: AlertService,
    check_interval_secs: u64,
    timeout: ChronoDuration,
}

impl InactivityWatchdog {
    pub fn new(
        guard: Arc<ScreenGuard>,
        alerts: AlertService,
        check_interval_secs: u64,
        inactivity_minutes: u64,
    ) -> Self {
        Self {
            guard,
            alerts,
            check_interval_secs: check_interval_secs.max(1),
            timeout: ChronoDuration::minutes(inactivity_minutes as i64),
        }
    }

    /// Run one inactivity check. Returns true when this check locked
    /// the screen.
    pub async fn check_once(&self, now: DateTime<Utc>) -> bool {
        if !self.guard.idle_expired(now, self.timeout) {
            return false;
        }
        if self.guard.lock() {
            self.alerts
                .raise(
                    AlertKind::ScreenLocked,
                    None,
                    "The application has been locked due to inactivity",
                )
                .await;
            return true;
        }
        false
    }

    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.check_interval_secs,
            "Inactivity watchdog started"
        );
        let mut ticker = interval(Duration::from_secs(self.check_interval_secs));
        loop {
            ticker.tick().await;
            self.check_once(Utc::now()).await;
        }
    }
}
