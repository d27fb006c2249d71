use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::{CoreError, Result};

/// A right-open time range: `start <= t < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// The `days`-day window ending at `now`.
    ///
    /// Fails with `Query` for `days <= 0` or when the start would fall
    /// outside the representable date range.
    pub fn last_days(days: i64, now: DateTime<Utc>) -> Result<Self> {
        if days <= 0 {
            return Err(CoreError::Query(anyhow::anyhow!(
                "window must cover at least one day, got {days}"
            )));
        }
        let start = days_before(now, days).ok_or_else(|| {
            CoreError::Query(anyhow::anyhow!("window of {days} days is out of range"))
        })?;
        Ok(Self { start, end: now })
    }

    /// The equal-length window ending where this one starts, or `None` if
    /// its start is not representable.
    pub fn preceding(&self) -> Option<Self> {
        let start = self.start.checked_sub_signed(self.length())?;
        Some(Self {
            start,
            end: self.start,
        })
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    pub fn length(&self) -> Duration {
        self.end - self.start
    }
}

/// `now` minus `days` whole days, `None` on overflow.
pub fn days_before(now: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(Duration::try_days(days)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn last_days_ends_at_now() {
        let w = TimeWindow::last_days(7, now()).unwrap();
        assert_eq!(w.end, now());
        assert_eq!(w.start, Utc.with_ymd_and_hms(2026, 3, 8, 12, 0, 0).unwrap());
    }

    #[test]
    fn non_positive_days_are_rejected() {
        assert!(matches!(
            TimeWindow::last_days(0, now()),
            Err(CoreError::Query(_))
        ));
        assert!(matches!(
            TimeWindow::last_days(-3, now()),
            Err(CoreError::Query(_))
        ));
    }

    #[test]
    fn preceding_is_contiguous_and_equal_length() {
        let w = TimeWindow::last_days(30, now()).unwrap();
        let prev = w.preceding().expect("preceding window");
        assert_eq!(prev.end, w.start);
        assert_eq!(prev.length(), w.length());
        assert_eq!(prev.start, now() - Duration::days(60));
    }

    #[test]
    fn out_of_range_days_are_a_query_error() {
        assert!(matches!(
            TimeWindow::last_days(100_000_000, now()),
            Err(CoreError::Query(_))
        ));
        assert!(matches!(
            TimeWindow::last_days(i64::MAX, now()),
            Err(CoreError::Query(_))
        ));
    }

    #[test]
    fn preceding_is_none_past_the_minimum_date() {
        let w = TimeWindow::last_days(60_000_000, now()).expect("representable window");
        assert_eq!(w.preceding(), None);
    }

    #[test]
    fn window_is_right_open() {
        let w = TimeWindow::last_days(1, now()).unwrap();
        assert!(w.contains(w.start));
        assert!(!w.contains(w.end));
        assert!(!w.preceding().expect("preceding window").contains(w.start));
    }
}
