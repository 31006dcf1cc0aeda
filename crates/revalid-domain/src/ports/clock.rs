//! Clock Port
//!
//! Staleness and expiry are evaluated lazily against "now". Providers and the
//! query client read "now" through this port so that time can be driven
//! deterministically in tests.

use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Source of the current wall-clock time
pub trait Clock: Send + Sync + Debug {
    /// Current instant in UTC
    fn now(&self) -> DateTime<Utc>;
}

/// Shared clock for dependency injection
pub type SharedClock = Arc<dyn Clock>;

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a shared system clock
    pub fn shared() -> SharedClock {
        Arc::new(Self)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock
///
/// Starts at the instant it was created (or the given instant) and only
/// moves when [`ManualClock::advance`] or [`ManualClock::set`] is called.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a manual clock frozen at the current system time
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Create a manual clock frozen at `instant`
    pub fn starting_at(instant: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(instant)),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let delta = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::MAX);
        if let Ok(mut now) = self.now.write() {
            *now = now.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC);
        }
    }

    /// Jump to an explicit instant
    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut now) = self.now.write() {
            *now = instant;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.read().map(|now| *now).unwrap_or_else(|e| *e.into_inner())
    }
}
