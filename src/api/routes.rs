use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::admin::FlagAdmin;
use crate::domain::{EvalResult, Flag, TargetingRule};
use crate::evaluation::Evaluator;
use crate::observability::MetricsRegistry;
use crate::storage::Store;

use super::request::{split_evaluation_params, AddRuleRequest, CreateFlagRequest, UpdateFlagRequest};
use super::response::{ApiError, ErrorResponse, HealthResponse, ReadyResponse};

/// Shared application state.
pub struct AppState {
    /// Flag evaluation engine
    pub evaluator: Evaluator,

    /// Administrative operations on flags and rules
    pub admin: FlagAdmin,

    /// Backing store, used for readiness checks
    pub store: Arc<dyn Store>,

    pub metrics: Arc<MetricsRegistry>,

    /// Application start time
    pub start_time: Instant,

    /// Application version
    pub version: String,

    /// Latency budget in milliseconds for the evaluation endpoint
    pub latency_budget_ms: u64,
}

impl AppState {
    /// Wire an evaluator and admin service over one store.
    pub fn new<S: Store + 'static>(store: Arc<S>, latency_budget_ms: u64) -> Self {
        let metrics = Arc::new(MetricsRegistry::new());

        AppState {
            evaluator: Evaluator::new(store.clone(), store.clone()).with_metrics(metrics.clone()),
            admin: FlagAdmin::new(store.clone()).with_metrics(metrics.clone()),
            store,
            metrics,
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            latency_budget_ms,
        }
    }
}

/// Create the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/flags", get(handle_list_flags).post(handle_create_flag))
        .route("/flags/evaluate/:name", get(handle_evaluate))
        .route("/flags/:name", put(handle_update_flag))
        .route("/flags/:name/rules", get(handle_list_rules).post(handle_add_rule))
        .route("/health", get(handle_health))
        .route("/ready", get(handle_ready))
        .route("/metrics", get(handle_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Evaluate a flag. Every completed evaluation is a 200, including
/// not-found and disabled outcomes.
async fn handle_evaluate(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<EvalResult>, ApiError> {
    let start = Instant::now();

    let (user_id, attributes) = split_evaluation_params(params)
        .ok_or_else(|| ApiError::BadRequest("missing userId query parameter".to_string()))?;

    let result = state.evaluator.evaluate(&name, &user_id, &attributes).await?;

    let elapsed = start.elapsed();
    if elapsed.as_millis() > state.latency_budget_ms as u128 {
        warn!(
            flag = %name,
            user_id = %user_id,
            latency_ms = elapsed.as_millis(),
            budget_ms = state.latency_budget_ms,
            "Evaluation latency exceeded budget"
        );
    }

    Ok(Json(result))
}

async fn handle_create_flag(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateFlagRequest>,
) -> Result<(StatusCode, Json<Flag>), ApiError> {
    let flag = state.admin.create_flag(&req.name, req.description).await?;
    Ok((StatusCode::CREATED, Json(flag)))
}

async fn handle_list_flags(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Flag>>, ApiError> {
    Ok(Json(state.admin.list_flags().await?))
}

async fn handle_update_flag(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(req): Json<UpdateFlagRequest>,
) -> Result<Json<Flag>, ApiError> {
    Ok(Json(state.admin.update_flag(&name, req.into()).await?))
}

async fn handle_add_rule(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(req): Json<AddRuleRequest>,
) -> Result<(StatusCode, Json<TargetingRule>), ApiError> {
    let rule = state
        .admin
        .add_rule(&name, &req.attribute, &req.operator, &req.value)
        .await?;
    Ok((StatusCode::CREATED, Json(rule)))
}

async fn handle_list_rules(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Vec<TargetingRule>>, ApiError> {
    Ok(Json(state.admin.list_rules(&name).await?))
}

/// Health check endpoint.
async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// Readiness check endpoint.
async fn handle_ready(State(state): State<Arc<AppState>>) -> axum::response::Response {
    if let Err(e) = state.store.ping().await {
        warn!(store = state.store.backend(), error = %e, "Store not reachable");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new("Store not reachable", "NOT_READY")),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        Json(ReadyResponse {
            ready: true,
            store: state.store.backend().to_string(),
        }),
    )
        .into_response()
}

/// Metrics endpoint (Prometheus format).
async fn handle_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let metrics = format!(
        r#"# HELP flagr_uptime_seconds Application uptime in seconds
# TYPE flagr_uptime_seconds counter
flagr_uptime_seconds {}

{}"#,
        state.start_time.elapsed().as_secs(),
        state.metrics.to_prometheus(),
    );

    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; charset=utf-8",
        )],
        metrics,
    )
}
