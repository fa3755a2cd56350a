use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Identifier wrapper for Shopify orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shopify fulfillment status. A missing status is modelled as `None` on the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Unfulfilled,
    Partial,
    Fulfilled,
    Archived,
    Cancelled,
}

impl OrderStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Unfulfilled => "unfulfilled",
            OrderStatus::Partial => "partial",
            OrderStatus::Fulfilled => "fulfilled",
            OrderStatus::Archived => "archived",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Lenient parse for exports. Unknown values are logged and treated as
    /// missing, which keeps the order eligible for warehouse checks.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "null" => None,
            "unfulfilled" => Some(Self::Unfulfilled),
            "partial" | "partially_fulfilled" => Some(Self::Partial),
            "fulfilled" => Some(Self::Fulfilled),
            "archived" => Some(Self::Archived),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            other => {
                warn!(status = other, "unrecognized order status; treating as unfulfilled");
                None
            }
        }
    }
}

/// Closed carrier status vocabulary shared by snapshots, events and orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackingStatus {
    Accepted,
    PickedUp,
    InTransit,
    ArrivedAtFacility,
    OutForDelivery,
    Delivered,
    Exception,
    Delayed,
    Unknown,
    PreTransit,
}

impl TrackingStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TrackingStatus::Accepted => "ACCEPTED",
            TrackingStatus::PickedUp => "PICKED_UP",
            TrackingStatus::InTransit => "IN_TRANSIT",
            TrackingStatus::ArrivedAtFacility => "ARRIVED_AT_FACILITY",
            TrackingStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            TrackingStatus::Delivered => "DELIVERED",
            TrackingStatus::Exception => "EXCEPTION",
            TrackingStatus::Delayed => "DELAYED",
            TrackingStatus::Unknown => "UNKNOWN",
            TrackingStatus::PreTransit => "PRE_TRANSIT",
        }
    }

    /// Lenient parse for carrier payloads and exports. Unrecognized codes are
    /// logged and mapped to `Unknown`; blank input is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        let status = match normalized.as_str() {
            "" | "NULL" => return None,
            "ACCEPTED" => Self::Accepted,
            "PICKED_UP" => Self::PickedUp,
            "IN_TRANSIT" => Self::InTransit,
            "ARRIVED_AT_FACILITY" => Self::ArrivedAtFacility,
            "OUT_FOR_DELIVERY" => Self::OutForDelivery,
            "DELIVERED" => Self::Delivered,
            "EXCEPTION" => Self::Exception,
            "DELAYED" => Self::Delayed,
            "UNKNOWN" => Self::Unknown,
            "PRE_TRANSIT" => Self::PreTransit,
            other => {
                warn!(status = other, "unrecognized tracking status");
                Self::Unknown
            }
        };
        Some(status)
    }

    /// Statuses in which a parcel is still nominally moving through the network.
    pub fn is_in_motion(&self) -> bool {
        match self {
            TrackingStatus::InTransit
            | TrackingStatus::PickedUp
            | TrackingStatus::Accepted
            | TrackingStatus::ArrivedAtFacility
            | TrackingStatus::Exception
            | TrackingStatus::Delayed => true,
            TrackingStatus::Delivered
            | TrackingStatus::OutForDelivery
            | TrackingStatus::PreTransit
            | TrackingStatus::Unknown => false,
        }
    }

    /// Statuses under which an overrun ETA counts as a carrier delay.
    pub fn awaits_delivery(&self) -> bool {
        matches!(
            self,
            TrackingStatus::InTransit | TrackingStatus::Accepted | TrackingStatus::PickedUp
        )
    }
}

/// Single carrier scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub timestamp: DateTime<Utc>,
    pub status: TrackingStatus,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Fresh carrier view of a shipment. Never persisted by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSnapshot {
    pub status: TrackingStatus,
    #[serde(default)]
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub original_estimated_delivery_date: Option<DateTime<Utc>>,
    /// Chronological, oldest first.
    #[serde(default)]
    pub events: Vec<TrackingEvent>,
}

impl TrackingSnapshot {
    pub fn latest_event(&self) -> Option<&TrackingEvent> {
        self.events.iter().max_by_key(|event| event.timestamp)
    }
}

/// Order row as ingested from Shopify webhooks and the tracking refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub shop_domain: String,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub carrier_code: Option<String>,
    #[serde(default)]
    pub tracking_status: Option<TrackingStatus>,
    #[serde(default)]
    pub last_tracking_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub original_eta: Option<DateTime<Utc>>,
    #[serde(default)]
    pub current_eta: Option<DateTime<Utc>>,
}

impl Order {
    /// Tracking number and carrier code, when both are present and non-blank.
    pub fn tracking_reference(&self) -> Option<(&str, &str)> {
        let number = non_blank(self.tracking_number.as_deref())?;
        let carrier = non_blank(self.carrier_code.as_deref())?;
        Some((number, carrier))
    }

    /// Fold a fresh snapshot into the stored tracking columns.
    pub fn apply_snapshot(&mut self, snapshot: &TrackingSnapshot) {
        self.tracking_status = Some(snapshot.status);
        if snapshot.estimated_delivery_date.is_some() {
            self.current_eta = snapshot.estimated_delivery_date;
        }
        if self.original_eta.is_none() {
            self.original_eta = snapshot
                .original_estimated_delivery_date
                .or(snapshot.estimated_delivery_date);
        }
        if let Some(latest) = snapshot.latest_event() {
            let newer = self
                .last_tracking_update
                .map(|current| latest.timestamp > current)
                .unwrap_or(true);
            if newer {
                self.last_tracking_update = Some(latest.timestamp);
            }
        }
    }
}

/// Merchant contact triple configured per shop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantContact {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Per-shop thresholds and toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelaySettings {
    #[serde(default = "default_warehouse_days", alias = "delay_threshold_days")]
    pub warehouse_delay_days: i64,
    #[serde(default = "default_carrier_days")]
    pub carrier_delay_days: i64,
    #[serde(default = "default_transit_days")]
    pub transit_delay_days: i64,
    #[serde(default = "enabled")]
    pub warehouse_delays_enabled: bool,
    #[serde(default = "enabled")]
    pub carrier_delays_enabled: bool,
    #[serde(default = "enabled")]
    pub transit_delays_enabled: bool,
    #[serde(default = "enabled")]
    pub email_enabled: bool,
    #[serde(default)]
    pub sms_enabled: bool,
    #[serde(default)]
    pub merchant: MerchantContact,
}

fn default_warehouse_days() -> i64 {
    2
}

fn default_carrier_days() -> i64 {
    1
}

fn default_transit_days() -> i64 {
    7
}

fn enabled() -> bool {
    true
}

impl Default for DelaySettings {
    fn default() -> Self {
        Self {
            warehouse_delay_days: default_warehouse_days(),
            carrier_delay_days: default_carrier_days(),
            transit_delay_days: default_transit_days(),
            warehouse_delays_enabled: true,
            carrier_delays_enabled: true,
            transit_delays_enabled: true,
            email_enabled: true,
            sms_enabled: false,
            merchant: MerchantContact::default(),
        }
    }
}

/// Order joined with its shop's settings; the unit of classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDelayRow {
    pub order: Order,
    #[serde(default)]
    pub settings: DelaySettings,
}

/// Classification label chosen per alert; drives recipient routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DelayType {
    WarehouseDelay,
    CarrierDelay,
    TransitDelay,
}

impl DelayType {
    pub fn label(&self) -> &'static str {
        match self {
            DelayType::WarehouseDelay => "WAREHOUSE_DELAY",
            DelayType::CarrierDelay => "CARRIER_DELAY",
            DelayType::TransitDelay => "TRANSIT_DELAY",
        }
    }
}

/// Why an evaluator flagged a delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DelayReason {
    WarehouseDelay,
    /// Carrier moved the estimate past the originally promised date.
    CarrierDelay,
    EventDelay,
    EtaExceeded,
    StuckInTransit,
}

impl DelayReason {
    pub fn label(&self) -> &'static str {
        match self {
            DelayReason::WarehouseDelay => "WAREHOUSE_DELAY",
            DelayReason::CarrierDelay => "CARRIER_DELAY",
            DelayReason::EventDelay => "EVENT_DELAY",
            DelayReason::EtaExceeded => "ETA_EXCEEDED",
            DelayReason::StuckInTransit => "STUCK_IN_TRANSIT",
        }
    }

    pub fn delay_type(&self) -> DelayType {
        match self {
            DelayReason::WarehouseDelay => DelayType::WarehouseDelay,
            DelayReason::CarrierDelay | DelayReason::EventDelay | DelayReason::EtaExceeded => {
                DelayType::CarrierDelay
            }
            DelayReason::StuckInTransit => DelayType::TransitDelay,
        }
    }

    /// Qualitative signals carry no day count and are not held to day thresholds.
    pub fn is_qualitative(&self) -> bool {
        matches!(self, DelayReason::EventDelay)
    }
}

/// Who a decision is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientSource {
    Customer,
    Merchant,
}

/// Contact details resolved for a decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
}

impl Recipient {
    pub fn for_customer(order: &Order) -> Self {
        Self {
            email: order.customer_email.clone(),
            phone: order.customer_phone.clone(),
            name: order.customer_name.clone(),
        }
    }

    pub fn for_merchant(contact: &MerchantContact) -> Self {
        Self {
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            name: contact.name.clone(),
        }
    }

    pub fn email(&self) -> Option<&str> {
        non_blank(self.email.as_deref())
    }

    pub fn phone(&self) -> Option<&str> {
        non_blank(self.phone.as_deref())
    }

    pub fn is_reachable(&self) -> bool {
        self.email().is_some() || self.phone().is_some()
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
