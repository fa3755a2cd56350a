//! Shipment delay detection: rule evaluators, the per-shop classifier, alert
//! idempotency, and notification dispatch requests.

pub mod classifier;
pub(crate) mod detection;
pub mod domain;
pub mod notification;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use classifier::{DelayClassifier, DelayDecision};
pub use detection::{
    check_carrier_delay, check_transit_delay, check_warehouse_delay, DelayVerdict, DELAY_KEYWORDS,
    EVENT_SCAN_WINDOW,
};
pub use domain::{
    DelayReason, DelaySettings, DelayType, MerchantContact, Order, OrderDelayRow, OrderId,
    OrderStatus, Recipient, RecipientSource, TrackingEvent, TrackingSnapshot, TrackingStatus,
};
pub use notification::{
    tracking_url, NotificationChannel, NotificationError, NotificationPayload, NotificationRequest,
};
pub use repository::{
    AlertFlags, AlertInsert, AlertKey, AlertStore, DelayAlert, NotificationRequester, OrderSource,
    StoreError, TrackingError, TrackingProvider,
};
pub use router::{delay_router, EvaluateRequest};
pub use service::{BatchReport, DelayMonitorService, DelayServiceError, OrderOutcome};
