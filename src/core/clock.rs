use crate::domain::model::Window;
use crate::utils::error::{PusherError, Result};
use chrono::{DateTime, TimeDelta, Timelike, Utc};
use std::time::Duration;

/// Produces contiguous, fixed-width windows starting far enough in the past
/// that Cloudflare has finished indexing them.
#[derive(Debug, Clone)]
pub struct WindowClock {
    window_start: DateTime<Utc>,
    interval: TimeDelta,
}

impl WindowClock {
    /// Fails for a zero interval or one whose first window chrono cannot
    /// represent.
    pub fn new(now: DateTime<Utc>, interval_secs: u64) -> Result<Self> {
        let invalid = || PusherError::InvalidConfigValueError {
            field: "--interval".to_string(),
            value: interval_secs.to_string(),
            reason: "Interval must be a positive number of seconds".to_string(),
        };

        let interval = i64::try_from(interval_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .filter(|interval| *interval > TimeDelta::zero())
            .ok_or_else(invalid)?;
        let window_start = Self::lag(interval)
            .and_then(|lag| floor_to_minute(now).checked_sub_signed(lag))
            .ok_or_else(invalid)?;

        Ok(Self {
            window_start,
            interval,
        })
    }

    /// How far behind `now` the first window starts: two minutes plus the
    /// interval's whole minutes.
    pub fn lag(interval: TimeDelta) -> Option<TimeDelta> {
        TimeDelta::try_minutes(interval.num_minutes().checked_add(2)?)
    }

    pub fn next_window(&mut self) -> Window {
        let window = Window::local(self.window_start, self.interval);
        self.window_start = window.end();
        window
    }

    /// Start of the window the next call to [`next_window`](Self::next_window) returns.
    pub fn cursor(&self) -> DateTime<Utc> {
        self.window_start
    }

    pub fn interval(&self) -> Duration {
        self.interval.to_std().unwrap_or_default()
    }
}

fn floor_to_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        - TimeDelta::seconds(instant.second() as i64)
        - TimeDelta::nanoseconds(instant.nanosecond() as i64)
}

/// Time to sleep so that ticks land on multiples of `interval` after the anchor,
/// whatever the dispatch overhead of earlier ticks was.
pub fn dispatch_delay(elapsed: Duration, interval: Duration) -> Duration {
    let interval_ns = interval.as_nanos();
    if interval_ns == 0 {
        return Duration::ZERO;
    }
    let remainder = elapsed.as_nanos() % interval_ns;
    Duration::from_nanos((interval_ns - remainder) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_lag_matches_interval_buckets() {
        let lag = |secs| WindowClock::lag(TimeDelta::seconds(secs)).unwrap();
        assert_eq!(lag(60), TimeDelta::seconds(180));
        assert_eq!(lag(30), TimeDelta::seconds(120));
        assert_eq!(lag(90), TimeDelta::seconds(180));
        assert_eq!(lag(300), TimeDelta::seconds(420));
    }

    #[test]
    fn test_first_window_is_backdated_from_floored_minute() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 7, 42).unwrap()
            + TimeDelta::milliseconds(250);
        let mut clock = WindowClock::new(now, 60).unwrap();

        let first = clock.next_window();
        assert_eq!(
            first.start(),
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 4, 0).unwrap()
        );
        assert_eq!(first.end(), Utc.with_ymd_and_hms(2024, 5, 1, 10, 5, 0).unwrap());
    }

    #[test]
    fn test_windows_are_contiguous_and_fixed_width() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 23, 58, 13).unwrap();

        for interval in [1u64, 30, 60, 90, 300, 3600] {
            let mut clock = WindowClock::new(now, interval).unwrap();
            let windows: Vec<Window> = (0..50).map(|_| clock.next_window()).collect();

            for window in &windows {
                assert_eq!(window.width(), TimeDelta::seconds(interval as i64));
            }
            for pair in windows.windows(2) {
                assert_eq!(pair[0].end(), pair[1].start(), "interval {}", interval);
            }
            assert_eq!(clock.cursor(), windows[49].end());
        }
    }

    #[test]
    fn test_unrepresentable_intervals_are_rejected() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();

        for interval in [0, u64::MAX, 10_000_000_000_000_000, 9_000_000_000_000_000] {
            let err = WindowClock::new(now, interval).unwrap_err();
            assert!(
                matches!(err, PusherError::InvalidConfigValueError { .. }),
                "interval {}",
                interval
            );
        }
    }

    #[test]
    fn test_dispatch_delay_corrects_drift() {
        let interval = Duration::from_secs(60);
        assert_eq!(dispatch_delay(Duration::ZERO, interval), interval);
        assert_eq!(
            dispatch_delay(Duration::from_millis(1_500), interval),
            Duration::from_millis(58_500)
        );
        // A slow tick still lands on the next multiple of the interval.
        assert_eq!(
            dispatch_delay(Duration::from_secs(125), interval),
            Duration::from_secs(55)
        );
        assert_eq!(dispatch_delay(Duration::from_secs(5), Duration::ZERO), Duration::ZERO);
    }
}
