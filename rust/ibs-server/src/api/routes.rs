//! API Routes
//!
//! HTTP endpoints for device registration, lookup, listing and health.
//! Every device is served by the parameterized `/:name` route, which reads
//! the registry at request time.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::Metrics;
use crate::config::ServerConfig;
use crate::error::DirectoryError;
use crate::registry::liveness::Thresholds;
use crate::registry::ownership::Admission;
use crate::registry::SharedRegistry;
use crate::types::{DeviceStatus, RegistrationRequest};

/// Shared API state
pub struct ApiState {
    pub config: Arc<ServerConfig>,
    pub registry: SharedRegistry,
    pub metrics: Arc<Metrics>,
}

/// Build the HTTP router
pub fn router(state: Arc<ApiState>) -> Router {
    let mut app = Router::new()
        // Registration & listing
        .route("/", get(list_devices).post(register_device))
        .route("/report", post(register_device))
        .route("/list", get(list_devices))

        // Health
        .route("/ping", get(ping))
        .route("/health", get(health_check))

        // Metrics
        .route("/metrics", get(get_metrics_prometheus))
        .route("/metrics/json", get(get_metrics_json))

        // Single device
        .route("/status/:name", get(device_status))
        .route("/:name", get(device_status));

    if state.config.http_resolver {
        app = app.route("/dns/:name", get(resolve_device));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    app.layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP API server
pub async fn run_api_server(
    config: Arc<ServerConfig>,
    registry: SharedRegistry,
    metrics: Arc<Metrics>,
) -> anyhow::Result<()> {
    let addr = SocketAddr::new(config.bind_address, config.http_port);

    let state = Arc::new(ApiState {
        config,
        registry,
        metrics,
    });

    info!("📊 HTTP API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// POST / and /report - Register or refresh a device
async fn register_device(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<StatusCode, DirectoryError> {
    state.metrics.inc_registrations_received();

    let result = apply_registration(&state, &body).await;
    match &result {
        Ok(Admission::Created) => state.metrics.inc_registrations_created(),
        Ok(Admission::Updated) => state.metrics.inc_registrations_updated(),
        Err(e) => state.metrics.inc_rejected(e),
    }

    result.map(|_| StatusCode::OK)
}

async fn apply_registration(state: &ApiState, body: &[u8]) -> Result<Admission, DirectoryError> {
    let request: RegistrationRequest = serde_json::from_slice(body).map_err(|e| {
        warn!("Undecodable registration: {}", e);
        DirectoryError::BadRequest("Bad argument".to_string())
    })?;

    let claim = request.into_claim().map_err(|e| {
        warn!("Invalid registration: {}", e);
        e
    })?;

    let now = Utc::now();
    let report_time = if state.config.trust_client_timestamp {
        claim.reported_at.unwrap_or(now)
    } else {
        now
    };

    // Read, decide and write under one write guard
    let mut reg = state.registry.write().await;
    reg.register(claim, &state.config.passkey, report_time)
}

/// GET /:name and /status/:name - JSON status of one device
async fn device_status(
    State(state): State<Arc<ApiState>>,
    Path(name): Path<String>,
) -> Result<Json<DeviceStatus>, DirectoryError> {
    let record = {
        let reg = state.registry.read().await;
        reg.get(&name).cloned()
    }
    .ok_or(DirectoryError::NotFound(name))?;

    let thresholds = Thresholds::from_config(&state.config);
    let liveness = thresholds.classify(record.age_secs(Utc::now()));

    Ok(Json(DeviceStatus::new(&record, liveness)))
}

/// GET /dns/:name - Plain-text address of one device
async fn resolve_device(
    State(state): State<Arc<ApiState>>,
    Path(name): Path<String>,
) -> Result<String, DirectoryError> {
    let reg = state.registry.read().await;
    reg.get(&name)
        .map(|record| format!("{}\n", record.address))
        .ok_or(DirectoryError::NotFound(name))
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    format: Option<String>,
}

/// GET / and /list - Devices reported within the list horizon
async fn list_devices(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<ListParams>,
) -> Response {
    match collect_statuses(&state).await {
        Ok(statuses) => match params.format.as_deref() {
            Some("text") => (
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                render_table(&statuses),
            )
                .into_response(),
            _ => Json(statuses).into_response(),
        },
        Err(e) => e.into_response(),
    }
}

async fn collect_statuses(state: &ApiState) -> Result<Vec<DeviceStatus>, DirectoryError> {
    let now = Utc::now();
    let snapshot = {
        let reg = state.registry.read().await;
        reg.list()
    };

    let thresholds = Thresholds::from_config(&state.config);
    let horizon = state.config.list_horizon();

    let mut statuses = Vec::with_capacity(snapshot.len());
    for (name, record) in snapshot {
        if record.name != name {
            return Err(DirectoryError::Internal(format!(
                "registry key {} holds record for {}",
                name, record.name
            )));
        }

        if horizon.is_some_and(|h| record.is_stale(now, h)) {
            continue;
        }

        statuses.push(DeviceStatus::new(&record, thresholds.classify(record.age_secs(now))));
    }

    statuses.sort_by(|a, b| a.device_name.cmp(&b.device_name));
    Ok(statuses)
}

/// Fixed-width table for terminals
fn render_table(statuses: &[DeviceStatus]) -> String {
    let mut out = String::new();
    for status in statuses {
        out.push_str(&format!(
            "{:<20} {:<15} {} {}\n",
            status.device_name,
            status.address,
            status.timestamp.format("%Y-%m-%d %H:%M:%S"),
            status.status,
        ));
    }
    out
}

/// GET /ping - Service liveness check
async fn ping() -> StatusCode {
    StatusCode::OK
}

/// GET /health - Simple health check
async fn health_check() -> impl IntoResponse {
    "OK"
}

/// Refresh device gauges from the registry
async fn refresh_gauges(state: &ApiState) {
    let census = {
        let reg = state.registry.read().await;
        reg.census(Utc::now(), &Thresholds::from_config(&state.config))
    };
    state.metrics.set_census(&census);
}

/// GET /metrics - Prometheus format metrics
async fn get_metrics_prometheus(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    refresh_gauges(&state).await;

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.metrics.to_prometheus(),
    )
}

/// GET /metrics/json - JSON format metrics
async fn get_metrics_json(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    refresh_gauges(&state).await;

    Json(state.metrics.to_json())
}
