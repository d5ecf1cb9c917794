use chrono::{DateTime, Local, Timelike, Utc};
use std::sync::atomic::{AtomicU32, Ordering};

/// Source of wall-clock time for the engine.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Local hour-of-day (0-23), used for the restricted-hours window.
    fn local_hour(&self) -> u32;
}

/// The host clock in the local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_hour(&self) -> u32 {
        Local::now().hour()
    }
}

/// A clock pinned to a settable hour. Timestamps still advance.
#[derive(Debug)]
pub struct FixedClock {
    hour: AtomicU32,
}

impl FixedClock {
    pub fn at_hour(hour: u32) -> Self {
        Self {
            hour: AtomicU32::new(hour % 24),
        }
    }

    pub fn set_hour(&self, hour: u32) {
        self.hour.store(hour % 24, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_hour(&self) -> u32 {
        self.hour.load(Ordering::SeqCst)
    }
}
