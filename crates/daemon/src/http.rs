use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use ipvsd_core::{BackendOptions, ServiceOptions};

use crate::context::Context;
use crate::error::DaemonError;
use crate::metrics::Metrics;

/// Shared state handed to every axum handler.
pub struct AppState {
    pub context: Arc<Context>,
    pub metrics: Arc<Metrics>,
}

/// Builds the router described in the daemon's external interface: CRUD
/// over services and backends, plus liveness and Prometheus endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/service", get(list_services))
        .route("/service/:vs_id", put(put_service).delete(delete_service).get(get_service))
        .route(
            "/service/:vs_id/:rs_id",
            put(put_backend).delete(delete_backend).get(get_backend),
        )
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn list_services(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.context.list_services().await)
}

async fn get_service(
    State(state): State<Arc<AppState>>,
    Path(vs_id): Path<String>,
) -> Result<impl IntoResponse, DaemonError> {
    Ok(Json(state.context.get_service(&vs_id).await?))
}

async fn put_service(
    State(state): State<Arc<AppState>>,
    Path(vs_id): Path<String>,
    Json(opts): Json<ServiceOptions>,
) -> Result<impl IntoResponse, DaemonError> {
    let svc = state.context.update_service(&vs_id, &opts).await?;
    Ok(Json(svc))
}

async fn delete_service(
    State(state): State<Arc<AppState>>,
    Path(vs_id): Path<String>,
) -> Result<impl IntoResponse, DaemonError> {
    let svc = state.context.remove_service(&vs_id).await?;
    Ok(Json(svc))
}

async fn get_backend(
    State(state): State<Arc<AppState>>,
    Path((_vs_id, rs_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, DaemonError> {
    Ok(Json(state.context.get_backend(&rs_id).await?))
}

async fn put_backend(
    State(state): State<Arc<AppState>>,
    Path((vs_id, rs_id)): Path<(String, String)>,
    Json(opts): Json<BackendOptions>,
) -> Result<impl IntoResponse, DaemonError> {
    let backend = state.context.put_backend(&vs_id, &rs_id, &opts).await?;
    Ok(Json(backend))
}

async fn delete_backend(
    State(state): State<Arc<AppState>>,
    Path((vs_id, rs_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, DaemonError> {
    let backend = state.context.remove_backend(&vs_id, &rs_id).await?;
    Ok(Json(backend))
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.metrics.render()
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
