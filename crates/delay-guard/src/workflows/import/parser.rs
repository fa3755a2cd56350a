use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use std::io::Read;

use super::OrderImportError;
use crate::workflows::delays::domain::{
    DelaySettings, MerchantContact, Order, OrderDelayRow, OrderId, OrderStatus, TrackingStatus,
};

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<OrderDelayRow>, OrderImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();

    for (index, record) in csv_reader.deserialize::<OrderExportRow>().enumerate() {
        let line = index + 2;
        let row = record?;
        rows.push(row.into_delay_row(line)?);
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct OrderExportRow {
    order_id: String,
    shop_domain: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    order_number: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    status: Option<String>,
    created_at: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    customer_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    customer_email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    customer_phone: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    tracking_number: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    carrier_code: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    tracking_status: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    last_tracking_update: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    original_eta: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    current_eta: Option<String>,
    #[serde(
        default,
        alias = "delay_threshold_days",
        deserialize_with = "empty_string_as_none"
    )]
    warehouse_delay_days: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    carrier_delay_days: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    transit_delay_days: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    warehouse_delays_enabled: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    carrier_delays_enabled: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    transit_delays_enabled: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    email_enabled: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    sms_enabled: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    merchant_email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    merchant_phone: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    merchant_name: Option<String>,
}

impl OrderExportRow {
    fn into_delay_row(self, line: usize) -> Result<OrderDelayRow, OrderImportError> {
        let created_at = parse_datetime(&self.created_at)
            .ok_or_else(|| invalid(line, "created_at", &self.created_at))?;

        let order = Order {
            id: OrderId(self.order_id),
            shop_domain: self.shop_domain,
            order_number: self.order_number,
            status: self.status.as_deref().and_then(OrderStatus::parse),
            created_at,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            tracking_number: self.tracking_number,
            carrier_code: self.carrier_code,
            tracking_status: self.tracking_status.as_deref().and_then(TrackingStatus::parse),
            last_tracking_update: optional_datetime(
                line,
                "last_tracking_update",
                self.last_tracking_update,
            )?,
            original_eta: optional_datetime(line, "original_eta", self.original_eta)?,
            current_eta: optional_datetime(line, "current_eta", self.current_eta)?,
        };

        let defaults = DelaySettings::default();
        let settings = DelaySettings {
            warehouse_delay_days: days(
                line,
                "warehouse_delay_days",
                self.warehouse_delay_days,
                defaults.warehouse_delay_days,
            )?,
            carrier_delay_days: days(
                line,
                "carrier_delay_days",
                self.carrier_delay_days,
                defaults.carrier_delay_days,
            )?,
            transit_delay_days: days(
                line,
                "transit_delay_days",
                self.transit_delay_days,
                defaults.transit_delay_days,
            )?,
            warehouse_delays_enabled: flag(
                line,
                "warehouse_delays_enabled",
                self.warehouse_delays_enabled,
                defaults.warehouse_delays_enabled,
            )?,
            carrier_delays_enabled: flag(
                line,
                "carrier_delays_enabled",
                self.carrier_delays_enabled,
                defaults.carrier_delays_enabled,
            )?,
            transit_delays_enabled: flag(
                line,
                "transit_delays_enabled",
                self.transit_delays_enabled,
                defaults.transit_delays_enabled,
            )?,
            email_enabled: flag(line, "email_enabled", self.email_enabled, defaults.email_enabled)?,
            sms_enabled: flag(line, "sms_enabled", self.sms_enabled, defaults.sms_enabled)?,
            merchant: MerchantContact {
                email: self.merchant_email,
                phone: self.merchant_phone,
                name: self.merchant_name,
            },
        };

        Ok(OrderDelayRow { order, settings })
    }
}

fn invalid(line: usize, field: &'static str, value: &str) -> OrderImportError {
    OrderImportError::InvalidField {
        line,
        field,
        value: value.to_string(),
    }
}

fn optional_datetime(
    line: usize,
    field: &'static str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, OrderImportError> {
    match value {
        Some(raw) => parse_datetime(&raw)
            .map(Some)
            .ok_or_else(|| invalid(line, field, &raw)),
        None => Ok(None),
    }
}

fn days(
    line: usize,
    field: &'static str,
    value: Option<String>,
    default: i64,
) -> Result<i64, OrderImportError> {
    match value {
        Some(raw) => raw
            .parse::<i64>()
            .ok()
            .filter(|days| *days >= 0)
            .ok_or_else(|| invalid(line, field, &raw)),
        None => Ok(default),
    }
}

fn flag(
    line: usize,
    field: &'static str,
    value: Option<String>,
    default: bool,
) -> Result<bool, OrderImportError> {
    match value {
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" => Ok(true),
            "false" | "f" | "no" | "n" | "0" => Ok(false),
            _ => Err(invalid(line, field, &raw)),
        },
        None => Ok(default),
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    None
}

#[cfg(test)]
pub(crate) fn parse_datetime_for_tests(value: &str) -> Option<DateTime<Utc>> {
    parse_datetime(value)
}
