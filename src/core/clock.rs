//! Time source for start-time and sample timestamps.

use std::sync::Mutex;

use time::{Duration, OffsetDateTime};

/// Supplies the current wall-clock time to a session.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A clock that only moves when told to. Used for reproducible output.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        ManualClock {
            now: Mutex::new(start),
        }
    }

    /// Starts at the given Unix timestamp (whole seconds).
    pub fn at_unix(seconds: i64) -> Self {
        Self::new(OffsetDateTime::from_unix_timestamp(seconds).unwrap_or(OffsetDateTime::UNIX_EPOCH))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_only_on_request() {
        let clock = ManualClock::at_unix(1_700_000_000);
        assert_eq!(clock.now().unix_timestamp(), 1_700_000_000);

        clock.advance(Duration::milliseconds(1500));
        assert_eq!(clock.now().unix_timestamp(), 1_700_000_001);
        assert_eq!(clock.now().millisecond(), 500);
    }

    #[test]
    fn system_clock_is_after_epoch() {
        assert!(SystemClock.now().unix_timestamp() > 0);
    }
}
