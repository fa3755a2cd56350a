use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::classifier::{DelayClassifier, DelayDecision};
use super::domain::{Order, OrderDelayRow, OrderId};
use super::notification::{
    NotificationChannel, NotificationError, NotificationPayload, NotificationRequest,
};
use super::repository::{
    AlertInsert, AlertStore, DelayAlert, NotificationRequester, OrderSource, StoreError,
    TrackingError, TrackingProvider,
};

/// What happened to a single order during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OrderOutcome {
    NoDelay,
    Alerted {
        decision: DelayDecision,
        alert_inserted: bool,
        channels_requested: Vec<NotificationChannel>,
    },
}

/// Tallies for a batch pass. Failed orders are counted, never fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub evaluated: usize,
    pub delayed: usize,
    pub alerts_created: usize,
    pub notifications_requested: usize,
    pub provider_errors: usize,
    pub store_errors: usize,
    pub contact_errors: usize,
    pub notification_errors: usize,
}

impl BatchReport {
    pub fn error_count(&self) -> usize {
        self.provider_errors + self.store_errors + self.contact_errors + self.notification_errors
    }

    fn record(&mut self, outcome: &OrderOutcome) {
        if let OrderOutcome::Alerted {
            alert_inserted,
            channels_requested,
            ..
        } = outcome
        {
            self.delayed += 1;
            if *alert_inserted {
                self.alerts_created += 1;
            }
            self.notifications_requested += channels_requested.len();
        }
    }

    fn record_error(&mut self, error: &DelayServiceError) {
        match error {
            DelayServiceError::Tracking(_) => self.provider_errors += 1,
            DelayServiceError::Store(_) => self.store_errors += 1,
            DelayServiceError::Notification(NotificationError::NoContactInformation { .. }) => {
                self.contact_errors += 1
            }
            DelayServiceError::Notification(NotificationError::Transport(_)) => {
                self.notification_errors += 1
            }
        }
    }
}

/// Per-order pipeline: classify, persist the alert idempotently, and request
/// notifications for channels that have not gone out yet.
pub struct DelayMonitorService<P, S, N> {
    provider: Arc<P>,
    classifier: DelayClassifier<P>,
    store: Arc<S>,
    requester: Arc<N>,
}

impl<P, S, N> DelayMonitorService<P, S, N>
where
    P: TrackingProvider + 'static,
    S: AlertStore + 'static,
    N: NotificationRequester + 'static,
{
    pub fn new(
        provider: Arc<P>,
        store: Arc<S>,
        requester: Arc<N>,
        min_carrier_delay_days: i64,
    ) -> Self {
        let classifier = DelayClassifier::new(provider.clone(), min_carrier_delay_days);
        Self {
            provider,
            classifier,
            store,
            requester,
        }
    }

    /// Run the full pipeline for one order. Store failures propagate so the
    /// caller can retry; a decision without any contact channel is an error.
    pub fn process_order(
        &self,
        row: &OrderDelayRow,
        now: DateTime<Utc>,
    ) -> Result<OrderOutcome, DelayServiceError> {
        let Some(decision) = self.classifier.classify(row, now)? else {
            return Ok(OrderOutcome::NoDelay);
        };

        let alert = DelayAlert::from_decision(&decision, now);
        let alert_inserted = match self.store.insert_alert_if_absent(alert)? {
            AlertInsert::Inserted => true,
            AlertInsert::AlreadyRecorded => false,
        };

        let flags = self
            .store
            .existing_alert_flags(&decision.order_id, decision.delay_type)?;
        let payload = NotificationPayload::build(&decision, &row.order)?;
        let channels = payload.pending_channels(&row.settings, flags);
        let template = payload.template();

        for channel in &channels {
            self.requester.request(NotificationRequest {
                channel: *channel,
                template: template.to_string(),
                payload: payload.clone(),
            })?;
        }

        info!(
            order_id = %decision.order_id,
            delay_type = decision.delay_type.label(),
            delay_reason = decision.delay_reason.label(),
            delay_days = decision.delay_days,
            alert_inserted,
            channels = channels.len(),
            "delay detected"
        );

        Ok(OrderOutcome::Alerted {
            decision,
            alert_inserted,
            channels_requested: channels,
        })
    }

    /// Evaluate many orders. Each order is isolated: failures are logged with
    /// the order id, counted, and the pass moves on.
    pub fn process_batch(&self, rows: &[OrderDelayRow], now: DateTime<Utc>) -> BatchReport {
        let mut report = BatchReport::default();

        for row in rows {
            report.evaluated += 1;
            match self.process_order(row, now) {
                Ok(outcome) => report.record(&outcome),
                Err(error) => {
                    warn!(
                        order_id = %row.order.id,
                        shop = %row.order.shop_domain,
                        %error,
                        "delay check failed for order"
                    );
                    report.record_error(&error);
                }
            }
        }

        info!(
            evaluated = report.evaluated,
            delayed = report.delayed,
            alerts_created = report.alerts_created,
            errors = report.error_count(),
            "delay batch finished"
        );
        report
    }

    /// Pull up to `limit` rows from `source` and run a batch over them.
    pub fn run_scheduled_refresh<O>(
        &self,
        source: &O,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<BatchReport, StoreError>
    where
        O: OrderSource + ?Sized,
    {
        let rows = source.orders_for_refresh(limit)?;
        debug!(orders = rows.len(), "scheduled delay refresh");
        Ok(self.process_batch(&rows, now))
    }

    /// Fetch a fresh snapshot and fold it into the order's tracking columns.
    /// Orders without a tracking reference are returned unchanged.
    pub fn refresh_order_tracking(&self, order: &Order) -> Result<Order, TrackingError> {
        let mut refreshed = order.clone();
        if let Some((tracking_number, carrier_code)) = order.tracking_reference() {
            let snapshot = self.provider.tracking_info(tracking_number, carrier_code)?;
            refreshed.apply_snapshot(&snapshot);
        }
        Ok(refreshed)
    }

    pub fn alerts_for_order(&self, order_id: &OrderId) -> Result<Vec<DelayAlert>, StoreError> {
        self.store.alerts_for_order(order_id)
    }
}

/// Error raised by the delay monitor for a single order.
#[derive(Debug, thiserror::Error)]
pub enum DelayServiceError {
    #[error(transparent)]
    Tracking(#[from] TrackingError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
}
