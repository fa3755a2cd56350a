use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::domain::{OrderDelayRow, OrderId};
use super::notification::NotificationError;
use super::repository::{AlertStore, NotificationRequester, TrackingProvider};
use super::service::{DelayMonitorService, DelayServiceError};

/// Body of an on-demand evaluation: the joined order row plus an optional
/// evaluation instant (defaults to the current time).
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    #[serde(flatten)]
    pub row: OrderDelayRow,
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

/// Router builder exposing delay evaluation and alert lookups.
pub fn delay_router<P, S, N>(service: Arc<DelayMonitorService<P, S, N>>) -> Router
where
    P: TrackingProvider + 'static,
    S: AlertStore + 'static,
    N: NotificationRequester + 'static,
{
    Router::new()
        .route("/api/v1/delays/evaluate", post(evaluate_handler::<P, S, N>))
        .route(
            "/api/v1/delays/orders/:order_id/alerts",
            get(alerts_handler::<P, S, N>),
        )
        .with_state(service)
}

pub(crate) async fn evaluate_handler<P, S, N>(
    State(service): State<Arc<DelayMonitorService<P, S, N>>>,
    axum::Json(request): axum::Json<EvaluateRequest>,
) -> Response
where
    P: TrackingProvider + 'static,
    S: AlertStore + 'static,
    N: NotificationRequester + 'static,
{
    let now = request.now.unwrap_or_else(Utc::now);
    let order_id = request.row.order.id.clone();

    // Collaborators are synchronous and may block on I/O.
    let pass =
        tokio::task::spawn_blocking(move || service.process_order(&request.row, now)).await;

    match pass {
        Ok(Ok(outcome)) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Ok(Err(error)) => error_response(&order_id, error),
        Err(error) => {
            warn!(order_id = %order_id, %error, "delay evaluation aborted");
            let payload = json!({
                "order_id": order_id.0,
                "code": "EVALUATION_ABORTED",
                "error": error.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn alerts_handler<P, S, N>(
    State(service): State<Arc<DelayMonitorService<P, S, N>>>,
    Path(order_id): Path<String>,
) -> Response
where
    P: TrackingProvider + 'static,
    S: AlertStore + 'static,
    N: NotificationRequester + 'static,
{
    let id = OrderId(order_id);
    match service.alerts_for_order(&id) {
        Ok(alerts) => {
            let payload = json!({
                "order_id": id.0,
                "alerts": alerts,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(&id, DelayServiceError::Store(error)),
    }
}

fn error_response(order_id: &OrderId, error: DelayServiceError) -> Response {
    let (status, code) = match &error {
        DelayServiceError::Tracking(_) => (StatusCode::BAD_GATEWAY, "TRACKING_PROVIDER"),
        DelayServiceError::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, "ALERT_STORE"),
        DelayServiceError::Notification(inner @ NotificationError::NoContactInformation { .. }) => {
            (StatusCode::UNPROCESSABLE_ENTITY, inner.code())
        }
        DelayServiceError::Notification(inner) => (StatusCode::SERVICE_UNAVAILABLE, inner.code()),
    };

    let payload = json!({
        "order_id": order_id.0,
        "code": code,
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
