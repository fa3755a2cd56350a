use super::super::domain::{DelayReason, Order, OrderStatus};
use super::{elapsed_days_floor, DelayVerdict};
use chrono::{DateTime, Utc};

/// Orders that have not left the warehouse beyond `threshold_days`.
///
/// Only unfulfilled orders are eligible; a missing status counts as
/// unfulfilled so that gaps in webhook data still surface delays.
pub fn check_warehouse_delay(
    order: &Order,
    threshold_days: i64,
    now: DateTime<Utc>,
) -> DelayVerdict {
    match order.status {
        None | Some(OrderStatus::Unfulfilled) => {}
        Some(OrderStatus::Partial)
        | Some(OrderStatus::Fulfilled)
        | Some(OrderStatus::Archived)
        | Some(OrderStatus::Cancelled) => return DelayVerdict::on_time(0),
    }

    let delay_days = elapsed_days_floor(order.created_at, now);
    DelayVerdict::against_threshold(delay_days, threshold_days, DelayReason::WarehouseDelay)
}

/// Shipments that are still moving but have produced no scan for `threshold_days`.
pub fn check_transit_delay(order: &Order, threshold_days: i64, now: DateTime<Utc>) -> DelayVerdict {
    let in_motion = order
        .tracking_status
        .map(|status| status.is_in_motion())
        .unwrap_or(false);
    if !in_motion {
        return DelayVerdict::on_time(0);
    }

    let Some(last_update) = order.last_tracking_update else {
        return DelayVerdict::on_time(0);
    };

    let delay_days = elapsed_days_floor(last_update, now);
    DelayVerdict::against_threshold(delay_days, threshold_days, DelayReason::StuckInTransit)
}
