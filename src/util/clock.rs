use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

/// Source of application time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Computer time, optionally shifted by a fixed offset
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    date_offset: Duration,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::with_offset(Duration::zero())
    }

    pub fn with_offset(date_offset: Duration) -> Self {
        Self { date_offset }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now() + self.date_offset
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = time;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 22, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance(Duration::milliseconds(1500));
        assert_eq!(clock.now(), start + Duration::milliseconds(1500));
    }

    #[test]
    fn test_system_clock_offset() {
        let clock = SystemClock::with_offset(Duration::days(1));
        let diff = clock.now() - Utc::now();
        assert!((diff - Duration::days(1)).num_seconds().abs() < 2);
    }
}
