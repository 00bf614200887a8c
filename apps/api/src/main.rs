//! Auditry API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::sync::Arc;
use std::time::Duration;

use auditry_application::{EventForwarder, IngestService, QueryService};
use auditry_core::AppError;
use auditry_infrastructure::{
    ClickHouseConfig, ClickHouseEventStore, HttpEventSink, OpenSearchEventIndex,
};
use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api_config::{ApiConfig, init_tracing};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    let sink = Arc::new(HttpEventSink::new(
        http_client.clone(),
        config.collector_url.clone(),
    ));
    let forwarder = EventForwarder::spawn(sink, config.forward_queue_depth);

    let store = Arc::new(ClickHouseEventStore::new(
        http_client.clone(),
        ClickHouseConfig {
            url: config.clickhouse_url.clone(),
            database: config.clickhouse_database.clone(),
            user: config.clickhouse_user.clone(),
            password: config.clickhouse_password.clone(),
        },
    ));
    let index = Arc::new(OpenSearchEventIndex::new(
        http_client,
        config.opensearch_url.clone(),
    ));

    let app_state = AppState {
        ingest_service: IngestService::new(forwarder),
        query_service: QueryService::new(store, index),
        ingest_api_key: config.ingest_api_key.clone(),
    };

    let app = build_router(app_state);

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "auditry-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}

/// Assembles the full route table over the shared state.
///
/// Write routes sit behind the shared-secret check; read routes sit
/// behind caller identity resolution. The two groups share `/v1/events`
/// with different methods.
fn build_router(app_state: AppState) -> Router {
    let ingest_routes = Router::new()
        .route("/v1/events", post(handlers::ingest::ingest_event_handler))
        .route(
            "/v1/events/batch",
            post(handlers::ingest::ingest_batch_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_api_key,
        ));

    let query_routes = Router::new()
        .route("/v1/events", get(handlers::events::list_events_handler))
        .route(
            "/v1/events/aggregations",
            get(handlers::events::aggregations_handler),
        )
        .route(
            "/v1/events/export",
            get(handlers::events::export_events_handler),
        )
        .route("/v1/events/{id}", get(handlers::events::get_event_handler))
        .route_layer(from_fn(middleware::resolve_tenant));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(ingest_routes)
        .merge(query_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
