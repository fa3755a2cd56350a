use super::common::*;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::delays::router::{delay_router, evaluate_handler, EvaluateRequest};
use crate::workflows::delays::service::DelayMonitorService;

fn evaluate_body(id: &str, created_at: &str) -> serde_json::Value {
    json!({
        "order": {
            "id": id,
            "shop_domain": "lumen-outfitters.myshopify.com",
            "status": null,
            "created_at": created_at,
            "customer_email": "ana.ruiz@example.com"
        },
        "settings": {
            "delay_threshold_days": 2,
            "merchant": { "email": "ops@lumen-outfitters.test", "name": "Lumen Outfitters" }
        },
        "now": "2025-10-20T14:00:00Z"
    })
}

#[tokio::test]
async fn evaluate_route_returns_alert_outcome() {
    let h = harness(StaticTrackingProvider::default());
    let app = delay_router(Arc::new(h.service));

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/delays/evaluate")
        .header("content-type", "application/json")
        .body(Body::from(
            evaluate_body("gid-5001", "2025-10-17T14:00:00Z").to_string(),
        ))
        .expect("request builds");

    let response = app.oneshot(request).await.expect("router responds");
    let (status, body) = json_body(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "alerted");
    assert_eq!(body["decision"]["delay_type"], "WAREHOUSE_DELAY");
    assert_eq!(body["decision"]["delay_days"], 3);
    assert_eq!(body["decision"]["source"], "merchant");
    assert_eq!(body["channels_requested"], json!(["email"]));
    assert_eq!(h.store.rows().len(), 1);
}

#[tokio::test]
async fn evaluate_route_reports_no_delay() {
    let h = harness(StaticTrackingProvider::default());
    let app = delay_router(Arc::new(h.service));

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/delays/evaluate")
        .header("content-type", "application/json")
        .body(Body::from(
            evaluate_body("gid-5002", "2025-10-20T08:00:00Z").to_string(),
        ))
        .expect("request builds");

    let response = app.oneshot(request).await.expect("router responds");
    let (status, body) = json_body(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "no_delay");
}

#[tokio::test]
async fn evaluate_handler_returns_unprocessable_without_contact() {
    let h = harness(StaticTrackingProvider::default());
    let service = Arc::new(h.service);
    let mut subject = row(warehouse_order("gid-5003", 4));
    subject.settings.merchant = Default::default();

    let response = evaluate_handler(
        State(service),
        axum::Json(EvaluateRequest {
            row: subject,
            now: Some(now()),
        }),
    )
    .await;
    let (status, body) = json_body(response).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "NO_CONTACT_INFORMATION");
    assert_eq!(body["order_id"], "gid-5003");
}

#[tokio::test]
async fn alerts_route_lists_recorded_alerts() {
    let h = harness(StaticTrackingProvider::default());
    h.service
        .process_order(&row(warehouse_order("gid-5004", 6)), now())
        .expect("pipeline runs");
    let app = delay_router(Arc::new(h.service));

    let request = Request::builder()
        .uri("/api/v1/delays/orders/gid-5004/alerts")
        .body(Body::empty())
        .expect("request builds");

    let response = app.oneshot(request).await.expect("router responds");
    let (status, body) = json_body(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order_id"], "gid-5004");
    assert_eq!(body["alerts"][0]["delay_reason"], "WAREHOUSE_DELAY");
    assert_eq!(body["alerts"][0]["email_sent"], false);
}

#[tokio::test]
async fn alerts_route_surfaces_store_outage() {
    let service = Arc::new(DelayMonitorService::new(
        Arc::new(StaticTrackingProvider::default()),
        Arc::new(UnavailableStore),
        Arc::new(MemoryRequester::default()),
        1,
    ));

    let request = Request::builder()
        .uri("/api/v1/delays/orders/gid-5005/alerts")
        .body(Body::empty())
        .expect("request builds");

    let response = delay_router(service)
        .oneshot(request)
        .await
        .expect("router responds");
    let (status, body) = json_body(response).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "ALERT_STORE");
}
