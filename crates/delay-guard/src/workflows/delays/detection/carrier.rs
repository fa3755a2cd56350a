use super::super::domain::{DelayReason, TrackingSnapshot};
use super::{elapsed_days_ceil, DelayVerdict};
use chrono::{DateTime, Utc};

/// Words in a scan description or status that indicate a carrier-side problem.
pub const DELAY_KEYWORDS: [&str; 5] = ["delay", "delayed", "exception", "weather", "mechanical"];

/// Only the most recent scans are considered; older exceptions are usually resolved.
pub const EVENT_SCAN_WINDOW: usize = 3;

/// Carrier-reported delay for a fresh snapshot.
///
/// Rules run in order and the first hit wins:
/// 1. the estimate was pushed past the original promise by at least
///    `min_delay_days` (`CARRIER_DELAY`);
/// 2. one of the last [`EVENT_SCAN_WINDOW`] scans mentions a
///    [`DELAY_KEYWORDS`] entry (`EVENT_DELAY`);
/// 3. the estimate has passed while the parcel still awaits delivery
///    (`ETA_EXCEEDED`).
///
/// When nothing fires the base result is returned so the pushed-by day count
/// survives. Shop thresholds are applied by the classifier, not here.
pub fn check_carrier_delay(
    snapshot: &TrackingSnapshot,
    min_delay_days: i64,
    now: DateTime<Utc>,
) -> DelayVerdict {
    let base = eta_push_verdict(snapshot, min_delay_days);
    if base.is_delayed {
        return base;
    }

    if has_delay_event(snapshot) {
        return DelayVerdict::delayed(base.delay_days, DelayReason::EventDelay);
    }

    if let Some(verdict) = eta_exceeded_verdict(snapshot, now) {
        return verdict;
    }

    base
}

fn eta_push_verdict(snapshot: &TrackingSnapshot, min_delay_days: i64) -> DelayVerdict {
    match (
        snapshot.original_estimated_delivery_date,
        snapshot.estimated_delivery_date,
    ) {
        (Some(original), Some(estimate)) if estimate > original => {
            let pushed_by = elapsed_days_ceil(original, estimate);
            DelayVerdict::against_threshold(pushed_by, min_delay_days, DelayReason::CarrierDelay)
        }
        _ => DelayVerdict::on_time(0),
    }
}

fn has_delay_event(snapshot: &TrackingSnapshot) -> bool {
    let skip = snapshot.events.len().saturating_sub(EVENT_SCAN_WINDOW);
    snapshot.events.iter().skip(skip).any(|event| {
        mentions_delay(&event.description) || mentions_delay(event.status.label())
    })
}

fn mentions_delay(text: &str) -> bool {
    let lowered = text.to_lowercase();
    DELAY_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

fn eta_exceeded_verdict(snapshot: &TrackingSnapshot, now: DateTime<Utc>) -> Option<DelayVerdict> {
    let estimate = snapshot.estimated_delivery_date?;
    if estimate >= now || !snapshot.status.awaits_delivery() {
        return None;
    }

    Some(DelayVerdict::delayed(
        elapsed_days_ceil(estimate, now),
        DelayReason::EtaExceeded,
    ))
}
