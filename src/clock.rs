use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;

/// source of the current instant for billing calculations
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

impl Clock for SafeTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        SafeTimeProvider::now(self)
    }
}

/// clock pinned to a single instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use hourglass_rs::TimeSource;

    #[test]
    fn test_safe_time_provider_is_a_clock() {
        let start = Utc.with_ymd_and_hms(2000, 12, 1, 0, 0, 0).unwrap();
        let time = SafeTimeProvider::new(TimeSource::Test(start));
        let control = time.test_control().unwrap();

        let clock: &dyn Clock = &time;
        assert_eq!(clock.now(), start);

        control.advance(Duration::weeks(1));
        assert_eq!(clock.now(), start + Duration::weeks(1));
    }

    #[test]
    fn test_fixed_clock() {
        let instant = Utc.with_ymd_and_hms(2001, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(FixedClock(instant).now(), instant);
    }
}
