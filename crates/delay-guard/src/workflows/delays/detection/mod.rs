mod carrier;
mod rules;

pub use carrier::{check_carrier_delay, DELAY_KEYWORDS, EVENT_SCAN_WINDOW};
pub use rules::{check_transit_delay, check_warehouse_delay};

use super::domain::DelayReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: i64 = 86_400;

/// Result of a single delay rule.
///
/// `delay_days` is populated whether or not the rule fired so callers can
/// show progress toward a threshold; `delay_reason` only when it fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayVerdict {
    pub is_delayed: bool,
    pub delay_days: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_reason: Option<DelayReason>,
}

impl DelayVerdict {
    pub fn on_time(delay_days: i64) -> Self {
        Self {
            is_delayed: false,
            delay_days,
            delay_reason: None,
        }
    }

    pub fn delayed(delay_days: i64, reason: DelayReason) -> Self {
        Self {
            is_delayed: true,
            delay_days,
            delay_reason: Some(reason),
        }
    }

    /// Threshold rule shared by the duration-based checks (inclusive).
    pub(crate) fn against_threshold(
        delay_days: i64,
        threshold_days: i64,
        reason: DelayReason,
    ) -> Self {
        if delay_days >= threshold_days {
            Self::delayed(delay_days, reason)
        } else {
            Self::on_time(delay_days)
        }
    }

    /// Whole days left before `threshold_days` is reached; zero once reached.
    pub fn days_until(&self, threshold_days: i64) -> i64 {
        (threshold_days - self.delay_days).max(0)
    }
}

/// Whole days elapsed from `from` to `now`, rounded down.
pub(crate) fn elapsed_days_floor(from: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - from).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Whole days elapsed from `from` to `now`, rounded up.
pub(crate) fn elapsed_days_ceil(from: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    -(from - now).num_seconds().div_euclid(SECONDS_PER_DAY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 20, 12, 0, 0).unwrap()
    }

    #[test]
    fn floor_and_ceil_disagree_only_on_partial_days() {
        let from = now() - Duration::hours(36);
        assert_eq!(elapsed_days_floor(from, now()), 1);
        assert_eq!(elapsed_days_ceil(from, now()), 2);

        let exact = now() - Duration::days(3);
        assert_eq!(elapsed_days_floor(exact, now()), 3);
        assert_eq!(elapsed_days_ceil(exact, now()), 3);
    }

    #[test]
    fn future_timestamps_floor_below_zero() {
        let future = now() + Duration::hours(6);
        assert_eq!(elapsed_days_floor(future, now()), -1);
        assert_eq!(elapsed_days_ceil(future, now()), 0);
    }

    #[test]
    fn days_until_saturates_at_zero() {
        let verdict = DelayVerdict::on_time(3);
        assert_eq!(verdict.days_until(7), 4);
        assert_eq!(verdict.days_until(2), 0);
    }
}
