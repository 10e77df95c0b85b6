use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{OriginalUri, Path, State, rejection::JsonRejection},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use metrics::counter;
use quire_common::QueryResult;
use quire_common::query::{
    Envelope, QueryPayload, QueryRequest, StatusPayload, TemplatePayload, TemplateRequest,
    TemplatesPayload,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::collab::{self, Rooms};
use crate::config::Config;
use crate::error::{ApiError, ServerError};
use crate::warehouse::{self, Warehouse, templates};

pub use quire_common::telemetry::{self, TelemetryConfig};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub warehouse: Arc<dyn Warehouse>,
    pub rooms: Arc<Rooms>,
}

impl AppState {
    pub fn new(warehouse: impl Warehouse + 'static, relay_capacity: usize) -> Self {
        Self {
            warehouse: Arc::new(warehouse),
            rooms: Arc::new(Rooms::new(relay_capacity)),
        }
    }
}

/// Build the axum router with the warehouse API, the collaboration relay and
/// the service endpoints.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/status", get(status))
        .route("/query", post(query))
        .route("/template/{name}", post(template))
        .route("/templates", get(list_templates))
        .route("/test-connection", post(test_connection));

    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/collab/{room}", get(collab::collab))
        .nest("/api/warehouse", api)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn status(State(state): State<AppState>) -> Json<Envelope<StatusPayload>> {
    Json(Envelope::ok(StatusPayload {
        connected: state.warehouse.is_connected(),
    }))
}

async fn query(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Envelope<QueryPayload>>, ApiError> {
    let Json(request) = body?;
    if request.query.trim().is_empty() {
        return Err(ApiError::MissingQuery);
    }
    debug!(query = %request.query, "query request");
    counter!("quire_query_requests_total").increment(1);

    let binds = request.parameters.binds();
    let data = state.warehouse.execute(&request.query, &binds).await?;
    Ok(Json(Envelope::ok(QueryPayload { data })))
}

async fn template(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Envelope<TemplatePayload>>, ApiError> {
    let Some(template) = templates::find(&name) else {
        counter!("quire_template_requests_total", "template" => "unknown").increment(1);
        return Err(ApiError::UnknownTemplate {
            name,
            available: templates::names(),
        });
    };
    // Parameters are optional; an empty body runs the template without binds.
    let request: TemplateRequest = if body.is_empty() {
        TemplateRequest::default()
    } else {
        serde_json::from_slice(&body)?
    };
    info!(template = template.name, description = template.description, "running template");
    counter!("quire_template_requests_total", "template" => template.name).increment(1);

    let binds = request.parameters.binds();
    let data = state
        .warehouse
        .execute(template.query, &binds)
        .await
        .map_err(|source| ApiError::Warehouse {
            template: Some(name.clone()),
            source,
        })?;

    Ok(Json(Envelope::ok(TemplatePayload {
        template_name: name,
        description: template.description.to_owned(),
        data,
    })))
}

async fn list_templates() -> Json<Envelope<TemplatesPayload>> {
    let templates = templates::infos();
    Json(Envelope::ok(TemplatesPayload {
        count: templates.len(),
        templates,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionTest {
    message: &'static str,
    test_result: QueryResult,
}

async fn test_connection(
    State(state): State<AppState>,
) -> Result<Json<Envelope<ConnectionTest>>, ApiError> {
    info!("testing warehouse connection");
    let test_result = state.warehouse.execute(warehouse::TEST_QUERY, &[]).await?;
    Ok(Json(Envelope::ok(ConnectionTest {
        message: "웨어하우스 연결 성공!",
        test_result,
    })))
}

#[derive(Debug, Serialize)]
struct ServiceInfo {
    message: &'static str,
    version: &'static str,
    endpoints: Endpoints,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct Endpoints {
    collab: &'static str,
    warehouse: &'static str,
    metrics: &'static str,
}

async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "quire collaboration server",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: Endpoints {
            collab: "/collab/{room}",
            warehouse: "/api/warehouse/*",
            metrics: "/metrics",
        },
        timestamp: Utc::now(),
    })
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    warehouse: bool,
    rooms: usize,
    timestamp: DateTime<Utc>,
}

/// Liveness only: an unreachable warehouse does not make the server unhealthy.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        warehouse: state.warehouse.is_connected(),
        rooms: state.rooms.room_count(),
        timestamp: Utc::now(),
    })
}

/// Prometheus metrics endpoint
async fn metrics() -> String {
    telemetry::render()
}

async fn not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::NotFound {
        path: uri.path().to_owned(),
    }
}

/// Run the HTTP server until ctrl-c, then disconnect the warehouse.
pub async fn run(state: AppState, config: &Config) -> Result<(), ServerError> {
    let addr = config.addr()?;
    let app = router(state.clone());

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind { addr, source: e })?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Serve { source: e })?;

    state.warehouse.disconnect().await;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
