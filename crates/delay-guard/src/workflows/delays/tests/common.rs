use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::delays::domain::{
    DelaySettings, DelayType, MerchantContact, Order, OrderDelayRow, OrderId, OrderStatus,
    TrackingEvent, TrackingSnapshot, TrackingStatus,
};
use crate::workflows::delays::notification::{
    NotificationChannel, NotificationError, NotificationRequest,
};
use crate::workflows::delays::repository::{
    AlertFlags, AlertInsert, AlertKey, AlertStore, DelayAlert, NotificationRequester,
    StoreError, TrackingError, TrackingProvider,
};
use crate::workflows::delays::service::DelayMonitorService;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 20, 14, 0, 0).unwrap()
}

pub(super) fn days_ago(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}

pub(super) fn order(id: &str) -> Order {
    Order {
        id: OrderId(id.to_string()),
        shop_domain: "lumen-outfitters.myshopify.com".to_string(),
        order_number: Some(format!("#{id}")),
        status: Some(OrderStatus::Unfulfilled),
        created_at: now() - Duration::hours(6),
        customer_name: Some("Ana Ruiz".to_string()),
        customer_email: Some("ana.ruiz@example.com".to_string()),
        customer_phone: Some("+15555550123".to_string()),
        tracking_number: None,
        carrier_code: None,
        tracking_status: None,
        last_tracking_update: None,
        original_eta: None,
        current_eta: None,
    }
}

/// Unfulfilled order well past every warehouse threshold.
pub(super) fn warehouse_order(id: &str, age_days: i64) -> Order {
    Order {
        created_at: days_ago(age_days),
        ..order(id)
    }
}

/// Shipped order that stopped scanning `idle_days` ago.
pub(super) fn in_transit_order(id: &str, idle_days: i64) -> Order {
    Order {
        status: Some(OrderStatus::Fulfilled),
        created_at: days_ago(idle_days + 2),
        tracking_number: Some(format!("1Z{id}")),
        carrier_code: Some("ups".to_string()),
        tracking_status: Some(TrackingStatus::InTransit),
        last_tracking_update: Some(days_ago(idle_days)),
        ..order(id)
    }
}

pub(super) fn merchant() -> MerchantContact {
    MerchantContact {
        email: Some("ops@lumen-outfitters.test".to_string()),
        phone: Some("+15555550999".to_string()),
        name: Some("Lumen Outfitters".to_string()),
    }
}

pub(super) fn settings() -> DelaySettings {
    DelaySettings {
        merchant: merchant(),
        ..DelaySettings::default()
    }
}

pub(super) fn row(order: Order) -> OrderDelayRow {
    OrderDelayRow {
        order,
        settings: settings(),
    }
}

pub(super) fn quiet_snapshot() -> TrackingSnapshot {
    TrackingSnapshot {
        status: TrackingStatus::InTransit,
        estimated_delivery_date: Some(now() + Duration::days(2)),
        original_estimated_delivery_date: Some(now() + Duration::days(2)),
        events: vec![TrackingEvent {
            timestamp: days_ago(1),
            status: TrackingStatus::InTransit,
            description: "Departed facility".to_string(),
            location: Some("Louisville, KY".to_string()),
        }],
    }
}

pub(super) fn overdue_snapshot(days_late: i64) -> TrackingSnapshot {
    TrackingSnapshot {
        estimated_delivery_date: Some(days_ago(days_late)),
        original_estimated_delivery_date: Some(days_ago(days_late)),
        ..quiet_snapshot()
    }
}

/// Carrier still reports the parcel moving, but its last scan is `idle_days` old.
pub(super) fn stalled_snapshot(idle_days: i64) -> TrackingSnapshot {
    TrackingSnapshot {
        events: vec![TrackingEvent {
            timestamp: days_ago(idle_days),
            status: TrackingStatus::InTransit,
            description: "In transit to next facility".to_string(),
            location: Some("Memphis, TN".to_string()),
        }],
        ..quiet_snapshot()
    }
}

pub(super) fn delivered_snapshot() -> TrackingSnapshot {
    TrackingSnapshot {
        status: TrackingStatus::Delivered,
        estimated_delivery_date: Some(days_ago(1)),
        original_estimated_delivery_date: Some(days_ago(1)),
        events: vec![TrackingEvent {
            timestamp: days_ago(1),
            status: TrackingStatus::Delivered,
            description: "Delivered, left at front door".to_string(),
            location: Some("Austin, TX".to_string()),
        }],
    }
}

pub(super) fn weather_snapshot() -> TrackingSnapshot {
    let mut snapshot = quiet_snapshot();
    snapshot.events.push(TrackingEvent {
        timestamp: now() - Duration::hours(5),
        status: TrackingStatus::InTransit,
        description: "Weather delay: flights grounded".to_string(),
        location: Some("Denver, CO".to_string()),
    });
    snapshot
}

/// Provider fake keyed by tracking number that counts lookups.
#[derive(Default)]
pub(super) struct StaticTrackingProvider {
    snapshots: Mutex<HashMap<String, TrackingSnapshot>>,
    failing: Mutex<HashMap<String, fn() -> TrackingError>>,
    calls: AtomicUsize,
}

impl StaticTrackingProvider {
    pub(super) fn with_snapshot(tracking_number: &str, snapshot: TrackingSnapshot) -> Self {
        let provider = Self::default();
        provider.insert(tracking_number, snapshot);
        provider
    }

    pub(super) fn insert(&self, tracking_number: &str, snapshot: TrackingSnapshot) {
        self.snapshots
            .lock()
            .expect("provider mutex poisoned")
            .insert(tracking_number.to_string(), snapshot);
    }

    pub(super) fn fail_with(&self, tracking_number: &str, error: fn() -> TrackingError) {
        self.failing
            .lock()
            .expect("provider mutex poisoned")
            .insert(tracking_number.to_string(), error);
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TrackingProvider for StaticTrackingProvider {
    fn tracking_info(
        &self,
        tracking_number: &str,
        carrier_code: &str,
    ) -> Result<TrackingSnapshot, TrackingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self
            .failing
            .lock()
            .expect("provider mutex poisoned")
            .get(tracking_number)
        {
            return Err(error());
        }
        self.snapshots
            .lock()
            .expect("provider mutex poisoned")
            .get(tracking_number)
            .cloned()
            .ok_or_else(|| TrackingError::NotFound {
                tracking_number: tracking_number.to_string(),
                carrier_code: carrier_code.to_string(),
            })
    }
}

#[derive(Default)]
pub(super) struct MemoryAlertStore {
    alerts: Mutex<BTreeMap<AlertKey, DelayAlert>>,
}

impl MemoryAlertStore {
    pub(super) fn rows(&self) -> Vec<DelayAlert> {
        self.alerts
            .lock()
            .expect("store mutex poisoned")
            .values()
            .cloned()
            .collect()
    }
}

impl AlertStore for MemoryAlertStore {
    fn insert_alert_if_absent(&self, alert: DelayAlert) -> Result<AlertInsert, StoreError> {
        let mut guard = self.alerts.lock().expect("store mutex poisoned");
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
        let guard = self.alerts.lock().expect("store mutex poisoned");
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
        let mut guard = self.alerts.lock().expect("store mutex poisoned");
        let alert = guard.get_mut(key).ok_or(StoreError::NotFound)?;
        match channel {
            NotificationChannel::Email => alert.email_sent = true,
            NotificationChannel::Sms => alert.sms_sent = true,
        }
        alert.updated_at = at;
        Ok(())
    }

    fn alerts_for_order(&self, order_id: &OrderId) -> Result<Vec<DelayAlert>, StoreError> {
        let guard = self.alerts.lock().expect("store mutex poisoned");
        Ok(guard
            .values()
            .filter(|alert| &alert.order_id == order_id)
            .cloned()
            .collect())
    }
}

/// Store whose backing database is down.
pub(super) struct UnavailableStore;

impl AlertStore for UnavailableStore {
    fn insert_alert_if_absent(&self, _alert: DelayAlert) -> Result<AlertInsert, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    fn existing_alert_flags(
        &self,
        _order_id: &OrderId,
        _delay_type: DelayType,
    ) -> Result<AlertFlags, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    fn mark_channel_sent(
        &self,
        _key: &AlertKey,
        _channel: NotificationChannel,
        _at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    fn alerts_for_order(&self, _order_id: &OrderId) -> Result<Vec<DelayAlert>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryRequester {
    requests: Mutex<Vec<NotificationRequest>>,
}

impl MemoryRequester {
    pub(super) fn requests(&self) -> Vec<NotificationRequest> {
        self.requests.lock().expect("requester mutex poisoned").clone()
    }
}

impl NotificationRequester for MemoryRequester {
    fn request(&self, request: NotificationRequest) -> Result<(), NotificationError> {
        self.requests
            .lock()
            .expect("requester mutex poisoned")
            .push(request);
        Ok(())
    }
}

pub(super) type TestService =
    DelayMonitorService<StaticTrackingProvider, MemoryAlertStore, MemoryRequester>;

pub(super) struct Harness {
    pub(super) provider: Arc<StaticTrackingProvider>,
    pub(super) store: Arc<MemoryAlertStore>,
    pub(super) requester: Arc<MemoryRequester>,
    pub(super) service: TestService,
}

pub(super) fn harness(provider: StaticTrackingProvider) -> Harness {
    let provider = Arc::new(provider);
    let store = Arc::new(MemoryAlertStore::default());
    let requester = Arc::new(MemoryRequester::default());
    let service = DelayMonitorService::new(provider.clone(), store.clone(), requester.clone(), 1);
    Harness {
        provider,
        store,
        requester,
        service,
    }
}

pub(super) async fn json_body(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    let value = serde_json::from_slice(&bytes).expect("json body");
    (status, value)
}
