use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classifier::DelayDecision;
use super::domain::{DelayReason, DelayType, OrderDelayRow, OrderId, TrackingSnapshot};
use super::notification::{NotificationChannel, NotificationError, NotificationRequest};

/// Carrier lookup capability (ShipEngine or similar).
pub trait TrackingProvider: Send + Sync {
    fn tracking_info(
        &self,
        tracking_number: &str,
        carrier_code: &str,
    ) -> Result<TrackingSnapshot, TrackingError>;
}

/// Failures surfaced by the tracking provider. Timeouts are reported the same
/// way as any other provider failure.
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("tracking number {tracking_number} not found for carrier {carrier_code}")]
    NotFound {
        tracking_number: String,
        carrier_code: String,
    },
    #[error("tracking provider rate limited the request")]
    RateLimited,
    #[error("tracking provider rejected credentials")]
    Unauthorized,
    #[error("tracking provider timed out")]
    Timeout,
    #[error("tracking provider unavailable: {0}")]
    Unavailable(String),
}

/// Idempotency key for alert rows: one active alert per order and delay type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlertKey {
    pub order_id: OrderId,
    pub delay_type: DelayType,
}

/// Persisted delay alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayAlert {
    pub order_id: OrderId,
    pub delay_type: DelayType,
    pub delay_days: i64,
    pub delay_reason: DelayReason,
    pub original_delivery_date: Option<DateTime<Utc>>,
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    pub email_sent: bool,
    pub sms_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DelayAlert {
    pub fn from_decision(decision: &DelayDecision, now: DateTime<Utc>) -> Self {
        Self {
            order_id: decision.order_id.clone(),
            delay_type: decision.delay_type,
            delay_days: decision.delay_days,
            delay_reason: decision.delay_reason,
            original_delivery_date: decision.original_eta,
            estimated_delivery_date: decision.estimated_eta,
            email_sent: false,
            sms_sent: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> AlertKey {
        AlertKey {
            order_id: self.order_id.clone(),
            delay_type: self.delay_type,
        }
    }

    pub fn flags(&self) -> AlertFlags {
        AlertFlags {
            email_sent: self.email_sent,
            sms_sent: self.sms_sent,
        }
    }
}

/// Channel delivery state of an existing alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertFlags {
    pub email_sent: bool,
    pub sms_sent: bool,
}

impl AlertFlags {
    pub fn is_sent(&self, channel: NotificationChannel) -> bool {
        match channel {
            NotificationChannel::Email => self.email_sent,
            NotificationChannel::Sms => self.sms_sent,
        }
    }
}

/// Outcome of an insert-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertInsert {
    Inserted,
    AlreadyRecorded,
}

/// Durable alert storage. Implementations must make `insert_alert_if_absent`
/// a no-op when a row with the same [`AlertKey`] exists (`ON CONFLICT DO NOTHING`).
pub trait AlertStore: Send + Sync {
    fn insert_alert_if_absent(&self, alert: DelayAlert) -> Result<AlertInsert, StoreError>;
    fn existing_alert_flags(
        &self,
        order_id: &OrderId,
        delay_type: DelayType,
    ) -> Result<AlertFlags, StoreError>;
    /// Called by the downstream sender once a channel has been delivered.
    fn mark_channel_sent(
        &self,
        key: &AlertKey,
        channel: NotificationChannel,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    fn alerts_for_order(&self, order_id: &OrderId) -> Result<Vec<DelayAlert>, StoreError>;
}

/// Error enumeration for alert store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("alert not found")]
    NotFound,
    #[error("alert store unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook towards the notification queue. Fire-and-forget: the worker
/// behind it sends and then calls [`AlertStore::mark_channel_sent`].
pub trait NotificationRequester: Send + Sync {
    fn request(&self, request: NotificationRequest) -> Result<(), NotificationError>;
}

/// Supplies order rows for the scheduled tracking refresh.
pub trait OrderSource: Send + Sync {
    fn orders_for_refresh(&self, limit: usize) -> Result<Vec<OrderDelayRow>, StoreError>;
}
