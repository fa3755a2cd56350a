use chrono::{DateTime, NaiveDate, Utc};
use delay_guard::error::AppError;
use delay_guard::workflows::delays::{
    AlertFlags, AlertInsert, AlertKey, AlertStore, DelayAlert, DelayType, NotificationChannel,
    NotificationError, NotificationRequest, NotificationRequester, OrderDelayRow, OrderId,
    OrderSource, StoreError, TrackingError, TrackingProvider, TrackingSnapshot,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Tracking lookups served from snapshots loaded up front. Unknown tracking
/// numbers report `NotFound`, the same as a carrier that has no record.
#[derive(Default, Clone)]
pub(crate) struct InMemoryTrackingProvider {
    snapshots: Arc<Mutex<HashMap<String, TrackingSnapshot>>>,
}

impl InMemoryTrackingProvider {
    pub(crate) fn insert(&self, tracking_number: &str, snapshot: TrackingSnapshot) {
        self.snapshots
            .lock()
            .expect("tracking mutex poisoned")
            .insert(tracking_number.to_string(), snapshot);
    }

    /// Seed from a JSON object keyed by tracking number. Returns how many
    /// snapshots were loaded.
    pub(crate) fn load_snapshots(&self, path: &Path) -> Result<usize, AppError> {
        let file = std::fs::File::open(path)?;
        let snapshots: HashMap<String, TrackingSnapshot> =
            serde_json::from_reader(file).map_err(std::io::Error::from)?;
        let loaded = snapshots.len();
        for (tracking_number, snapshot) in snapshots {
            self.insert(&tracking_number, snapshot);
        }
        Ok(loaded)
    }
}

impl TrackingProvider for InMemoryTrackingProvider {
    fn tracking_info(
        &self,
        tracking_number: &str,
        carrier_code: &str,
    ) -> Result<TrackingSnapshot, TrackingError> {
        let guard = self.snapshots.lock().expect("tracking mutex poisoned");
        guard
            .get(tracking_number)
            .cloned()
            .ok_or_else(|| TrackingError::NotFound {
                tracking_number: tracking_number.to_string(),
                carrier_code: carrier_code.to_string(),
            })
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAlertStore {
    alerts: Arc<Mutex<BTreeMap<AlertKey, DelayAlert>>>,
}

impl InMemoryAlertStore {
    pub(crate) fn alerts(&self) -> Vec<DelayAlert> {
        self.alerts
            .lock()
            .expect("alert store mutex poisoned")
            .values()
            .cloned()
            .collect()
    }
}

impl AlertStore for InMemoryAlertStore {
    fn insert_alert_if_absent(&self, alert: DelayAlert) -> Result<AlertInsert, StoreError> {
        let mut guard = self.alerts.lock().expect("alert store mutex poisoned");
        let key = alert.key();
        if guard.contains_key(&key) {
            return Ok(AlertInsert::AlreadyRecorded);
        }
        guard.insert(key, alert);
        Ok(AlertInsert::Inserted)
    }

    fn existing_alert_flags(
        &self,
        order_id: &OrderId,
        delay_type: DelayType,
    ) -> Result<AlertFlags, StoreError> {
        let guard = self.alerts.lock().expect("alert store mutex poisoned");
        let key = AlertKey {
            order_id: order_id.clone(),
            delay_type,
        };
        Ok(guard.get(&key).map(DelayAlert::flags).unwrap_or_default())
    }

    fn mark_channel_sent(
        &self,
        key: &AlertKey,
        channel: NotificationChannel,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut guard = self.alerts.lock().expect("alert store mutex poisoned");
        let alert = guard.get_mut(key).ok_or(StoreError::NotFound)?;
        match channel {
            NotificationChannel::Email => alert.email_sent = true,
            NotificationChannel::Sms => alert.sms_sent = true,
        }
        alert.updated_at = at;
        Ok(())
    }

    fn alerts_for_order(&self, order_id: &OrderId) -> Result<Vec<DelayAlert>, StoreError> {
        let guard = self.alerts.lock().expect("alert store mutex poisoned");
        Ok(guard
            .values()
            .filter(|alert| &alert.order_id == order_id)
            .cloned()
            .collect())
    }
}

/// Queue standing in for the email/SMS worker. `deliver_pending` plays the
/// worker's part: it drains the queue and marks each channel sent.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotificationQueue {
    pending: Arc<Mutex<Vec<NotificationRequest>>>,
}

impl InMemoryNotificationQueue {
    pub(crate) fn deliver_pending<S: AlertStore>(
        &self,
        store: &S,
        at: DateTime<Utc>,
    ) -> Result<Vec<NotificationRequest>, StoreError> {
        let drained: Vec<NotificationRequest> = self
            .pending
            .lock()
            .expect("notification mutex poisoned")
            .drain(..)
            .collect();

        for request in &drained {
            let key = AlertKey {
                order_id: request.payload.order_id.clone(),
                delay_type: request.payload.delay_type,
            };
            store.mark_channel_sent(&key, request.channel, at)?;
        }
        Ok(drained)
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.lock().expect("notification mutex poisoned").len()
    }
}

impl NotificationRequester for InMemoryNotificationQueue {
    fn request(&self, request: NotificationRequest) -> Result<(), NotificationError> {
        self.pending
            .lock()
            .expect("notification mutex poisoned")
            .push(request);
        Ok(())
    }
}

/// Rows eligible for the scheduled refresh, typically seeded from a CSV export.
#[derive(Default, Clone)]
pub(crate) struct InMemoryOrderSource {
    rows: Arc<Mutex<Vec<OrderDelayRow>>>,
}

impl InMemoryOrderSource {
    pub(crate) fn new(rows: Vec<OrderDelayRow>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(rows)),
        }
    }
}

impl OrderSource for InMemoryOrderSource {
    fn orders_for_refresh(&self, limit: usize) -> Result<Vec<OrderDelayRow>, StoreError> {
        let guard = self.rows.lock().expect("order source mutex poisoned");
        Ok(guard.iter().take(limit).cloned().collect())
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("failed to parse '{raw}' as RFC 3339 or YYYY-MM-DD"))
}
