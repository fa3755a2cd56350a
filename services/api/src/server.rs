use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryAlertStore, InMemoryNotificationQueue, InMemoryOrderSource,
    InMemoryTrackingProvider,
};
use crate::routes::with_delay_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use delay_guard::config::{AppConfig, DetectionConfig};
use delay_guard::error::AppError;
use delay_guard::telemetry;
use delay_guard::workflows::delays::DelayMonitorService;
use delay_guard::workflows::import::OrderCsvImporter;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

type ApiService =
    DelayMonitorService<InMemoryTrackingProvider, InMemoryAlertStore, InMemoryNotificationQueue>;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let seed = match args.orders.take() {
        Some(path) => OrderCsvImporter::from_path(path)?,
        None => Vec::new(),
    };
    let source = InMemoryOrderSource::new(seed);

    let provider = InMemoryTrackingProvider::default();
    if let Some(path) = args.tracking.take() {
        let loaded = provider.load_snapshots(&path)?;
        info!(snapshots = loaded, path = %path.display(), "tracking snapshots loaded");
    }

    let service: Arc<ApiService> = Arc::new(DelayMonitorService::new(
        Arc::new(provider),
        Arc::new(InMemoryAlertStore::default()),
        Arc::new(InMemoryNotificationQueue::default()),
        config.detection.min_carrier_delay_days,
    ));

    spawn_refresh_loop(service.clone(), source, &config.detection);

    let app = with_delay_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "delay guard api ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodically re-evaluate the order source. Each pass runs on the blocking
/// pool because collaborators are synchronous.
fn spawn_refresh_loop(
    service: Arc<ApiService>,
    source: InMemoryOrderSource,
    detection: &DetectionConfig,
) {
    let Some(period) = detection.refresh_interval() else {
        info!("scheduled delay refresh disabled");
        return;
    };
    let limit = detection.refresh_batch_limit;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let service = service.clone();
            let source = source.clone();
            let pass = tokio::task::spawn_blocking(move || {
                service.run_scheduled_refresh(&source, limit, Utc::now())
            })
            .await;

            match pass {
                Ok(Ok(report)) => info!(
                    evaluated = report.evaluated,
                    alerts_created = report.alerts_created,
                    errors = report.error_count(),
                    "scheduled delay refresh complete"
                ),
                Ok(Err(error)) => warn!(%error, "order source unavailable, skipping refresh"),
                Err(error) => warn!(%error, "scheduled delay refresh panicked"),
            }
        }
    });
}
