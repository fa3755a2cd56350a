use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::detection::{
    check_carrier_delay, check_transit_delay, check_warehouse_delay, DelayVerdict,
};
use super::domain::{
    DelayReason, DelaySettings, DelayType, Order, OrderDelayRow, OrderId, Recipient,
    RecipientSource, TrackingSnapshot,
};
use super::repository::{TrackingError, TrackingProvider};

/// Side-effect-free outcome of classifying one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayDecision {
    pub order_id: OrderId,
    pub delay_type: DelayType,
    pub delay_days: i64,
    pub delay_reason: DelayReason,
    pub recipient: Recipient,
    pub source: RecipientSource,
    pub original_eta: Option<DateTime<Utc>>,
    pub estimated_eta: Option<DateTime<Utc>>,
    pub tracking_number: Option<String>,
    pub carrier_code: Option<String>,
}

/// Composes the three delay rules under a shop's toggles.
///
/// Warehouse delays are checked first and go to the merchant; carrier and
/// transit delays go to the customer. At most one decision is produced per
/// pass even when several rules would fire.
pub struct DelayClassifier<P> {
    provider: Arc<P>,
    min_carrier_delay_days: i64,
}

impl<P> DelayClassifier<P>
where
    P: TrackingProvider,
{
    pub fn new(provider: Arc<P>, min_carrier_delay_days: i64) -> Self {
        Self {
            provider,
            min_carrier_delay_days,
        }
    }

    /// Classify one order. Provider failures are returned to the caller; a
    /// disabled branch never calls its evaluator or the provider.
    ///
    /// When the carrier branch fetched a snapshot, the transit rule runs
    /// against the order with that snapshot applied rather than the stored
    /// tracking columns.
    pub fn classify(
        &self,
        row: &OrderDelayRow,
        now: DateTime<Utc>,
    ) -> Result<Option<DelayDecision>, TrackingError> {
        let OrderDelayRow { order, settings } = row;

        if settings.warehouse_delays_enabled {
            let verdict = check_warehouse_delay(order, settings.warehouse_delay_days, now);
            if let Some(reason) = fired(&verdict) {
                return Ok(Some(merchant_decision(order, settings, &verdict, reason)));
            }
        }

        let mut refreshed: Option<Order> = None;
        if settings.carrier_delays_enabled {
            if let Some(snapshot) = self.fetch_snapshot(order)? {
                let floor = self.min_carrier_delay_days;
                if let Some(decision) = classify_carrier(order, settings, &snapshot, floor, now) {
                    return Ok(Some(decision));
                }
                let mut current = order.clone();
                current.apply_snapshot(&snapshot);
                refreshed = Some(current);
            }
        }

        if settings.transit_delays_enabled {
            let current = refreshed.as_ref().unwrap_or(order);
            let verdict = check_transit_delay(current, settings.transit_delay_days, now);
            if let Some(reason) = fired(&verdict) {
                return Ok(Some(customer_decision(
                    current,
                    &verdict,
                    reason,
                    current.original_eta,
                    current.current_eta,
                )));
            }
        }

        debug!(order_id = %order.id, "no qualifying delay");
        Ok(None)
    }

    fn fetch_snapshot(&self, order: &Order) -> Result<Option<TrackingSnapshot>, TrackingError> {
        let Some((tracking_number, carrier_code)) = order.tracking_reference() else {
            debug!(order_id = %order.id, "carrier check skipped without tracking reference");
            return Ok(None);
        };

        self.provider
            .tracking_info(tracking_number, carrier_code)
            .map(Some)
    }
}

fn classify_carrier(
    order: &Order,
    settings: &DelaySettings,
    snapshot: &TrackingSnapshot,
    min_carrier_delay_days: i64,
    now: DateTime<Utc>,
) -> Option<DelayDecision> {
    let verdict = check_carrier_delay(snapshot, min_carrier_delay_days, now);
    let reason = fired(&verdict)?;

    if !reason.is_qualitative() && verdict.delay_days < settings.carrier_delay_days {
        debug!(
            order_id = %order.id,
            delay_days = verdict.delay_days,
            threshold = settings.carrier_delay_days,
            "carrier delay below shop threshold"
        );
        return None;
    }

    let original_eta = snapshot
        .original_estimated_delivery_date
        .or(order.original_eta);
    let estimated_eta = snapshot.estimated_delivery_date.or(order.current_eta);
    Some(customer_decision(
        order,
        &verdict,
        reason,
        original_eta,
        estimated_eta,
    ))
}

fn fired(verdict: &DelayVerdict) -> Option<DelayReason> {
    if verdict.is_delayed {
        verdict.delay_reason
    } else {
        None
    }
}

fn merchant_decision(
    order: &Order,
    settings: &DelaySettings,
    verdict: &DelayVerdict,
    reason: DelayReason,
) -> DelayDecision {
    DelayDecision {
        order_id: order.id.clone(),
        delay_type: DelayType::WarehouseDelay,
        delay_days: verdict.delay_days,
        delay_reason: reason,
        recipient: Recipient::for_merchant(&settings.merchant),
        source: RecipientSource::Merchant,
        original_eta: order.original_eta,
        estimated_eta: order.current_eta,
        tracking_number: order.tracking_number.clone(),
        carrier_code: order.carrier_code.clone(),
    }
}

fn customer_decision(
    order: &Order,
    verdict: &DelayVerdict,
    reason: DelayReason,
    original_eta: Option<DateTime<Utc>>,
    estimated_eta: Option<DateTime<Utc>>,
) -> DelayDecision {
    DelayDecision {
        order_id: order.id.clone(),
        delay_type: reason.delay_type(),
        delay_days: verdict.delay_days,
        delay_reason: reason,
        recipient: Recipient::for_customer(order),
        source: RecipientSource::Customer,
        original_eta,
        estimated_eta,
        tracking_number: order.tracking_number.clone(),
        carrier_code: order.carrier_code.clone(),
    }
}
