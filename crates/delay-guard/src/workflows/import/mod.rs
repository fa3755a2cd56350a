mod parser;

use crate::workflows::delays::domain::OrderDelayRow;
use std::io::Read;
use std::path::Path;

/// Failure while reading an order export.
#[derive(Debug)]
pub enum OrderImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },
}

impl std::fmt::Display for OrderImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderImportError::Io(err) => write!(f, "failed to read order export: {}", err),
            OrderImportError::Csv(err) => write!(f, "invalid order CSV data: {}", err),
            OrderImportError::InvalidField { line, field, value } => write!(
                f,
                "line {}: column '{}' has unusable value '{}'",
                line, field, value
            ),
        }
    }
}

impl std::error::Error for OrderImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OrderImportError::Io(err) => Some(err),
            OrderImportError::Csv(err) => Some(err),
            OrderImportError::InvalidField { .. } => None,
        }
    }
}

impl From<std::io::Error> for OrderImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for OrderImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Reads an order export (one row per order, joined with its shop settings)
/// into rows the delay monitor can evaluate.
pub struct OrderCsvImporter;

impl OrderCsvImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<OrderDelayRow>, OrderImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<OrderDelayRow>, OrderImportError> {
        parser::parse_rows(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::delays::domain::{OrderStatus, TrackingStatus};
    use chrono::{TimeZone, Utc};
    use std::io::Cursor;

    const HEADER: &str = "order_id,shop_domain,status,created_at,customer_email,tracking_number,carrier_code,tracking_status,last_tracking_update,delay_threshold_days,transit_delays_enabled,merchant_email\n";

    #[test]
    fn parse_datetime_supports_rfc3339_and_date_strings() {
        let rfc = parser::parse_datetime_for_tests("2025-10-14T08:15:00-04:00").expect("parse rfc");
        assert_eq!(rfc, Utc.with_ymd_and_hms(2025, 10, 14, 12, 15, 0).unwrap());

        let date = parser::parse_datetime_for_tests("2025-10-01").expect("parse date");
        assert_eq!(date, Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap());

        assert!(parser::parse_datetime_for_tests("  ").is_none());
        assert!(parser::parse_datetime_for_tests("last tuesday").is_none());
    }

    #[test]
    fn importer_maps_blank_cells_to_defaults() {
        let csv = format!(
            "{HEADER}gid-1,north-peak.myshopify.com,,2025-10-10T09:00:00Z,,,,,,,,\n"
        );
        let rows = OrderCsvImporter::from_reader(Cursor::new(csv)).expect("import succeeds");
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row.order.status, None);
        assert_eq!(row.order.tracking_status, None);
        assert!(row.order.customer_email.is_none());
        assert_eq!(row.settings.warehouse_delay_days, 2);
        assert!(row.settings.transit_delays_enabled);
        assert!(row.settings.merchant.email.is_none());
    }

    #[test]
    fn importer_reads_tracking_and_settings_columns() {
        let csv = format!(
            "{HEADER}gid-2,north-peak.myshopify.com,fulfilled,2025-10-01,ana@example.com,1Z999,ups,in transit,2025-10-05T10:00:00Z,4,no,ops@northpeak.test\n"
        );
        let rows = OrderCsvImporter::from_reader(Cursor::new(csv)).expect("import succeeds");
        let row = &rows[0];

        assert_eq!(row.order.status, Some(OrderStatus::Fulfilled));
        assert_eq!(row.order.tracking_status, Some(TrackingStatus::InTransit));
        assert_eq!(
            row.order.last_tracking_update,
            Some(Utc.with_ymd_and_hms(2025, 10, 5, 10, 0, 0).unwrap())
        );
        assert_eq!(row.settings.warehouse_delay_days, 4);
        assert!(!row.settings.transit_delays_enabled);
        assert_eq!(
            row.settings.merchant.email.as_deref(),
            Some("ops@northpeak.test")
        );
    }

    #[test]
    fn importer_rejects_unparseable_created_at() {
        let csv = format!("{HEADER}gid-3,north-peak.myshopify.com,,yesterday,,,,,,,,\n");
        let error = OrderCsvImporter::from_reader(Cursor::new(csv)).expect_err("bad timestamp");

        match error {
            OrderImportError::InvalidField { line, field, .. } => {
                assert_eq!(line, 2);
                assert_eq!(field, "created_at");
            }
            other => panic!("expected invalid field, got {other:?}"),
        }
    }

    #[test]
    fn importer_rejects_negative_thresholds() {
        let csv = format!(
            "{HEADER}gid-4,north-peak.myshopify.com,,2025-10-10,,,,,,-1,,\n"
        );
        let error = OrderCsvImporter::from_reader(Cursor::new(csv)).expect_err("negative days");
        assert!(error.to_string().contains("warehouse_delay_days"));
    }

    #[test]
    fn importer_from_path_propagates_io_errors() {
        let error = OrderCsvImporter::from_path("./does-not-exist.csv").expect_err("io error");

        match error {
            OrderImportError::Io(_) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
