use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classifier::DelayDecision;
use super::domain::{
    non_blank, DelayReason, DelaySettings, DelayType, Order, OrderId, RecipientSource,
};
use super::repository::AlertFlags;

/// Delivery channel handled by the downstream sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Email,
    Sms,
}

/// Channel-agnostic message data for a delay notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub order_id: OrderId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    pub shop_domain: String,
    pub delay_type: DelayType,
    pub source: RecipientSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
    pub delay_days: i64,
    pub delay_reason: DelayReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_url: Option<String>,
}

impl NotificationPayload {
    /// Build the payload for `decision`. Fails with
    /// [`NotificationError::NoContactInformation`] when the chosen recipient
    /// has neither an email address nor a phone number.
    pub fn build(decision: &DelayDecision, order: &Order) -> Result<Self, NotificationError> {
        let recipient = &decision.recipient;
        if !recipient.is_reachable() {
            return Err(NotificationError::NoContactInformation {
                order_id: decision.order_id.clone(),
                audience: decision.source,
            });
        }

        let tracking_url = match (
            non_blank(decision.tracking_number.as_deref()),
            non_blank(decision.carrier_code.as_deref()),
        ) {
            (Some(number), Some(carrier)) => Some(tracking_url(carrier, number)),
            _ => None,
        };

        Ok(Self {
            order_id: decision.order_id.clone(),
            order_number: order.order_number.clone(),
            shop_domain: order.shop_domain.clone(),
            delay_type: decision.delay_type,
            source: decision.source,
            recipient_email: recipient.email().map(str::to_string),
            recipient_phone: recipient.phone().map(str::to_string),
            recipient_name: recipient.name.clone(),
            delay_days: decision.delay_days,
            delay_reason: decision.delay_reason,
            estimated_delivery: decision.estimated_eta,
            tracking_number: decision.tracking_number.clone(),
            tracking_url,
        })
    }

    /// Channels this payload should go out on, given shop toggles and what
    /// has already been delivered for the alert.
    pub fn pending_channels(
        &self,
        settings: &DelaySettings,
        flags: AlertFlags,
    ) -> Vec<NotificationChannel> {
        let mut channels = Vec::new();
        if settings.email_enabled
            && self.recipient_email.is_some()
            && !flags.is_sent(NotificationChannel::Email)
        {
            channels.push(NotificationChannel::Email);
        }
        if settings.sms_enabled
            && self.recipient_phone.is_some()
            && !flags.is_sent(NotificationChannel::Sms)
        {
            channels.push(NotificationChannel::Sms);
        }
        channels
    }

    /// Template identifier used by the sender for this delay and audience.
    pub fn template(&self) -> &'static str {
        match (self.delay_type, self.source) {
            (DelayType::WarehouseDelay, _) => "merchant_warehouse_delay",
            (DelayType::CarrierDelay, RecipientSource::Customer) => "customer_carrier_delay",
            (DelayType::TransitDelay, RecipientSource::Customer) => "customer_transit_delay",
            (DelayType::CarrierDelay, RecipientSource::Merchant)
            | (DelayType::TransitDelay, RecipientSource::Merchant) => "merchant_shipping_delay",
        }
    }
}

/// One queued send on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub channel: NotificationChannel,
    pub template: String,
    pub payload: NotificationPayload,
}

/// Dispatch-stage failures.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("NO_CONTACT_INFORMATION: no email or phone for {audience:?} recipient of order {order_id}")]
    NoContactInformation {
        order_id: OrderId,
        audience: RecipientSource,
    },
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

impl NotificationError {
    pub fn code(&self) -> &'static str {
        match self {
            NotificationError::NoContactInformation { .. } => "NO_CONTACT_INFORMATION",
            NotificationError::Transport(_) => "NOTIFICATION_TRANSPORT",
        }
    }
}

/// Public tracking page for a carrier, falling back to a carrier-agnostic lookup.
pub fn tracking_url(carrier_code: &str, tracking_number: &str) -> String {
    let number = tracking_number.trim();
    match carrier_code.trim().to_ascii_lowercase().as_str() {
        "ups" => format!("https://www.ups.com/track?tracknum={number}"),
        "usps" | "stamps_com" => {
            format!("https://tools.usps.com/go/TrackConfirmAction?tLabels={number}")
        }
        "fedex" => format!("https://www.fedex.com/fedextrack/?trknbr={number}"),
        "dhl" | "dhl_express" => {
            format!("https://www.dhl.com/en/express/tracking.html?AWB={number}")
        }
        "canada_post" => format!(
            "https://www.canadapost-postescanada.ca/track-reperage/en#/details/{number}"
        ),
        _ => format!("https://parcelsapp.com/en/tracking/{number}"),
    }
}
