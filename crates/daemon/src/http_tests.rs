use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use ipvsd_store::MemStore;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use super::*;

fn app() -> Router {
    let store = Arc::new(MemStore::new());
    let (pulse_tx, _pulse_rx) = mpsc::channel(16);
    let (sync_tx, _sync_rx) = mpsc::channel(1);
    let context = Arc::new(Context::new(store, pulse_tx, sync_tx, CancellationToken::new()));
    let metrics = Arc::new(Metrics::new().unwrap());
    router(Arc::new(AppState { context, metrics }))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn healthz_is_always_ok() {
    let response = app()
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_then_get_service() {
    let app = app();
    let body = serde_json::json!({"host": "10.0.0.1", "port": 80});
    let response = app
        .clone()
        .oneshot(
            Request::put("/service/vs-1")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::get("/service/vs-1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["health"], 1.0);
}

#[tokio::test]
async fn get_unknown_service_is_404() {
    let response = app()
        .oneshot(Request::get("/service/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_service_body_is_400() {
    let body = serde_json::json!({"host": "10.0.0.1", "port": 0});
    let response = app()
        .oneshot(
            Request::put("/service/vs-1")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn backend_requires_known_parent_service() {
    let body = serde_json::json!({"host": "10.0.0.2", "port": 8080});
    let response = app()
        .oneshot(
            Request::put("/service/nope/rs-1")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
