use crate::infra::{
    parse_timestamp, InMemoryAlertStore, InMemoryNotificationQueue, InMemoryTrackingProvider,
};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use delay_guard::config::AppConfig;
use delay_guard::error::AppError;
use delay_guard::telemetry;
use delay_guard::workflows::delays::{
    BatchReport, DelayAlert, DelayMonitorService, DelaySettings, MerchantContact, Order,
    OrderDelayRow, OrderId, OrderStatus, TrackingEvent, TrackingSnapshot, TrackingStatus,
};
use delay_guard::workflows::import::OrderCsvImporter;
use std::path::PathBuf;
use std::sync::Arc;

type CliService =
    DelayMonitorService<InMemoryTrackingProvider, InMemoryAlertStore, InMemoryNotificationQueue>;

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Order export (CSV, one row per order joined with shop settings)
    #[arg(long)]
    pub(crate) orders: PathBuf,
    /// Evaluation instant, RFC 3339 or YYYY-MM-DD (defaults to now)
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// JSON object mapping tracking numbers to carrier snapshots
    #[arg(long)]
    pub(crate) tracking: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Evaluation instant for the sample orders (defaults to now)
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) now: Option<DateTime<Utc>>,
}

struct Adapters {
    provider: Arc<InMemoryTrackingProvider>,
    store: Arc<InMemoryAlertStore>,
    queue: Arc<InMemoryNotificationQueue>,
    service: CliService,
}

fn adapters(min_carrier_delay_days: i64) -> Adapters {
    let provider = Arc::new(InMemoryTrackingProvider::default());
    let store = Arc::new(InMemoryAlertStore::default());
    let queue = Arc::new(InMemoryNotificationQueue::default());
    let service = DelayMonitorService::new(
        provider.clone(),
        store.clone(),
        queue.clone(),
        min_carrier_delay_days,
    );
    Adapters {
        provider,
        store,
        queue,
        service,
    }
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let EvaluateArgs {
        orders,
        now,
        tracking,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init_for_cli(&config.telemetry)?;

    let rows = OrderCsvImporter::from_path(&orders)?;
    let adapters = adapters(config.detection.min_carrier_delay_days);
    if let Some(path) = tracking {
        adapters.provider.load_snapshots(&path)?;
    }

    let now = now.unwrap_or_else(Utc::now);
    println!(
        "Evaluating {} orders from {} at {}",
        rows.len(),
        orders.display(),
        now.to_rfc3339()
    );

    let report = adapters.service.process_batch(&rows, now);
    render_report(&report);
    render_alerts(&adapters.store.alerts());
    println!(
        "\nNotification requests queued: {}",
        adapters.queue.pending()
    );

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let now = args.now.unwrap_or_else(Utc::now);
    let adapters = adapters(1);
    for (tracking_number, snapshot) in sample_snapshots(now) {
        adapters.provider.insert(tracking_number, snapshot);
    }

    println!("DelayGuard demo (evaluated {})", now.to_rfc3339());

    let mut rows = sample_rows(now);
    println!("\nTracking refresh");
    for row in rows.iter_mut() {
        if row.order.tracking_reference().is_none() {
            continue;
        }
        match adapters.service.refresh_order_tracking(&row.order) {
            Ok(refreshed) => {
                println!(
                    "- {}: {} (last scan {})",
                    display_number(&refreshed),
                    refreshed
                        .tracking_status
                        .map(|status| status.label())
                        .unwrap_or("unknown"),
                    refreshed
                        .last_tracking_update
                        .map(|at| at.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string())
                );
                row.order = refreshed;
            }
            Err(err) => println!("- {}: lookup failed ({})", display_number(&row.order), err),
        }
    }

    println!("\nFirst pass");
    let first = adapters.service.process_batch(&rows, now);
    render_report(&first);
    render_alerts(&adapters.store.alerts());

    match adapters.queue.deliver_pending(&*adapters.store, now) {
        Ok(delivered) => {
            println!("\nNotification worker delivered {} requests", delivered.len());
            for request in &delivered {
                println!(
                    "- {} via {:?} using template {}",
                    request.payload.order_number.as_deref().unwrap_or("-"),
                    request.channel,
                    request.template
                );
            }
        }
        Err(err) => println!("\nNotification worker unavailable: {}", err),
    }

    println!("\nSecond pass one hour later (alerts already recorded and sent)");
    let second = adapters.service.process_batch(&rows, now + Duration::hours(1));
    render_report(&second);

    let sample = OrderId("gid://shopify/Order/1002".to_string());
    match adapters.service.alerts_for_order(&sample) {
        Ok(alerts) => match serde_json::to_string_pretty(&alerts) {
            Ok(json) => println!("\nStored alerts for {}:\n{}", sample, json),
            Err(err) => println!("\nStored alerts unavailable: {}", err),
        },
        Err(err) => println!("\nAlert store unavailable: {}", err),
    }

    Ok(())
}

fn render_report(report: &BatchReport) {
    println!(
        "- {} evaluated | {} delayed | {} new alerts | {} notification requests",
        report.evaluated, report.delayed, report.alerts_created, report.notifications_requested
    );
    if report.error_count() > 0 {
        println!(
            "- errors: {} provider, {} store, {} missing contact, {} notification",
            report.provider_errors,
            report.store_errors,
            report.contact_errors,
            report.notification_errors
        );
    }
}

fn render_alerts(alerts: &[DelayAlert]) {
    if alerts.is_empty() {
        println!("\nAlerts: none");
        return;
    }

    println!("\nAlerts");
    for alert in alerts {
        let eta = alert
            .estimated_delivery_date
            .map(|eta| format!(", eta {}", eta.date_naive()))
            .unwrap_or_default();
        println!(
            "- {} | {} ({}) | {} days{} | email sent {} | sms sent {}",
            alert.order_id,
            alert.delay_type.label(),
            alert.delay_reason.label(),
            alert.delay_days,
            eta,
            alert.email_sent,
            alert.sms_sent
        );
    }
}

fn display_number(order: &Order) -> String {
    order
        .order_number
        .clone()
        .unwrap_or_else(|| order.id.to_string())
}

fn sample_settings() -> DelaySettings {
    DelaySettings {
        sms_enabled: true,
        merchant: MerchantContact {
            email: Some("fulfillment@harbor-goods.test".to_string()),
            phone: Some("+15555550142".to_string()),
            name: Some("Harbor Goods".to_string()),
        },
        ..DelaySettings::default()
    }
}

fn sample_order(number: u32, now: DateTime<Utc>) -> Order {
    Order {
        id: OrderId(format!("gid://shopify/Order/{number}")),
        shop_domain: "harbor-goods.myshopify.com".to_string(),
        order_number: Some(format!("#{number}")),
        status: Some(OrderStatus::Unfulfilled),
        created_at: now - Duration::hours(3),
        customer_name: Some("Jordan Park".to_string()),
        customer_email: Some("jordan.park@example.com".to_string()),
        customer_phone: Some("+15555550177".to_string()),
        tracking_number: None,
        carrier_code: None,
        tracking_status: None,
        last_tracking_update: None,
        original_eta: None,
        current_eta: None,
    }
}

fn shipped(number: u32, tracking_number: &str, carrier: &str, now: DateTime<Utc>) -> Order {
    Order {
        status: Some(OrderStatus::Fulfilled),
        created_at: now - Duration::days(6),
        tracking_number: Some(tracking_number.to_string()),
        carrier_code: Some(carrier.to_string()),
        tracking_status: Some(TrackingStatus::InTransit),
        last_tracking_update: Some(now - Duration::days(1)),
        ..sample_order(number, now)
    }
}

fn sample_rows(now: DateTime<Utc>) -> Vec<OrderDelayRow> {
    let settings = sample_settings();
    let stuck_in_warehouse = Order {
        created_at: now - Duration::days(4),
        ..sample_order(1001, now)
    };

    [
        stuck_in_warehouse,
        shipped(1002, "1Z999AA10123456784", "ups", now),
        shipped(1003, "9400111899223197428490", "usps", now),
        shipped(1004, "771234567890", "fedex", now),
        sample_order(1005, now),
    ]
    .into_iter()
    .map(|order| OrderDelayRow {
        order,
        settings: settings.clone(),
    })
    .collect()
}

fn scan(at: DateTime<Utc>, description: &str, location: &str) -> TrackingEvent {
    TrackingEvent {
        timestamp: at,
        status: TrackingStatus::InTransit,
        description: description.to_string(),
        location: Some(location.to_string()),
    }
}

fn sample_snapshots(now: DateTime<Utc>) -> Vec<(&'static str, TrackingSnapshot)> {
    vec![
        (
            "1Z999AA10123456784",
            TrackingSnapshot {
                status: TrackingStatus::InTransit,
                estimated_delivery_date: Some(now + Duration::days(4)),
                original_estimated_delivery_date: Some(now + Duration::days(1)),
                events: vec![scan(
                    now - Duration::hours(20),
                    "Departed facility",
                    "Louisville, KY",
                )],
            },
        ),
        (
            "9400111899223197428490",
            TrackingSnapshot {
                status: TrackingStatus::InTransit,
                estimated_delivery_date: Some(now + Duration::days(2)),
                original_estimated_delivery_date: Some(now + Duration::days(2)),
                events: vec![
                    scan(now - Duration::days(2), "Arrived at hub", "Denver, CO"),
                    scan(
                        now - Duration::hours(8),
                        "Weather delay: severe storms",
                        "Denver, CO",
                    ),
                ],
            },
        ),
        (
            "771234567890",
            TrackingSnapshot {
                status: TrackingStatus::InTransit,
                estimated_delivery_date: Some(now + Duration::days(1)),
                original_estimated_delivery_date: Some(now + Duration::days(1)),
                events: vec![scan(
                    now - Duration::days(9),
                    "In transit to destination",
                    "Memphis, TN",
                )],
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use delay_guard::workflows::delays::{DelayReason, DelayType};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 20, 15, 0, 0).unwrap()
    }

    fn seeded() -> Adapters {
        let adapters = adapters(1);
        for (tracking_number, snapshot) in sample_snapshots(now()) {
            adapters.provider.insert(tracking_number, snapshot);
        }
        adapters
    }

    #[test]
    fn sample_orders_cover_every_delay_reason() {
        let adapters = seeded();
        let mut rows = sample_rows(now());
        for row in rows.iter_mut() {
            row.order = adapters
                .service
                .refresh_order_tracking(&row.order)
                .expect("snapshots seeded");
        }

        let report = adapters.service.process_batch(&rows, now());
        assert_eq!(report.evaluated, 5);
        assert_eq!(report.delayed, 4);
        assert_eq!(report.error_count(), 0);

        let reasons: Vec<(DelayType, DelayReason)> = adapters
            .store
            .alerts()
            .iter()
            .map(|alert| (alert.delay_type, alert.delay_reason))
            .collect();
        assert!(reasons.contains(&(DelayType::WarehouseDelay, DelayReason::WarehouseDelay)));
        assert!(reasons.contains(&(DelayType::CarrierDelay, DelayReason::CarrierDelay)));
        assert!(reasons.contains(&(DelayType::CarrierDelay, DelayReason::EventDelay)));
        assert!(reasons.contains(&(DelayType::TransitDelay, DelayReason::StuckInTransit)));
    }

    #[test]
    fn second_pass_after_delivery_requests_nothing() {
        let adapters = seeded();
        let rows = sample_rows(now());

        let first = adapters.service.process_batch(&rows, now());
        assert!(first.notifications_requested > 0);
        adapters
            .queue
            .deliver_pending(&*adapters.store, now())
            .expect("alerts exist");

        let second = adapters
            .service
            .process_batch(&rows, now() + Duration::hours(1));
        assert_eq!(second.alerts_created, 0);
        assert_eq!(second.notifications_requested, 0);
        assert_eq!(adapters.queue.pending(), 0);
    }

    #[test]
    fn demo_runs_end_to_end() {
        run_demo(DemoArgs { now: Some(now()) }).expect("demo completes");
    }
}
