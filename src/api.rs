//! REST API for the DeepQuant agent
//!
//! The agent router is mounted twice: under `/api` and under
//! `/api/agents/{slug}` next to the agent catalog listing.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::agent::DeepQuantAgent;
use crate::catalog::{AgentCatalog, DEEPQUANT_SLUG};
use crate::error::DeepQuantError;
use crate::models::{BacktestRequest, BacktestStatus, Policy, PolicyRequest, PolicyResponse};

/// =============================
/// Error Responses
/// =============================

/// `{"detail": ...}` body with a status derived from the error kind
#[derive(Debug)]
pub struct ApiError(DeepQuantError);

impl<E> From<E> for ApiError
where
    E: Into<DeepQuantError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else if self.0.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Malformed or incomplete request bodies are input errors like any other
fn invalid_body(rejection: JsonRejection) -> DeepQuantError {
    DeepQuantError::InvalidRequest(rejection.body_text())
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<DeepQuantAgent>,
    pub catalog: Arc<AgentCatalog>,
}

/// =============================
/// Handlers
/// =============================

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn list_agents(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({ "agents": state.catalog.slugs() }))
}

async fn create_policy(
    State(state): State<ApiState>,
    payload: Result<Json<PolicyRequest>, JsonRejection>,
) -> ApiResult<PolicyResponse> {
    let Json(req) = payload.map_err(invalid_body)?;
    Ok(Json(state.agent.create_policy(req).await?))
}

async fn list_policies(State(state): State<ApiState>) -> ApiResult<Vec<Policy>> {
    Ok(Json(state.agent.list_policies().await?))
}

async fn get_policy(
    State(state): State<ApiState>,
    Path(policy_id): Path<String>,
) -> ApiResult<Policy> {
    let policy_id = Uuid::parse_str(&policy_id)?;
    Ok(Json(state.agent.get_policy(policy_id).await?))
}

async fn start_backtest(
    State(state): State<ApiState>,
    payload: Result<Json<BacktestRequest>, JsonRejection>,
) -> ApiResult<BacktestStatus> {
    let Json(req) = payload.map_err(invalid_body)?;
    Ok(Json(state.agent.submit_backtest(req).await?))
}

async fn backtest_status(
    State(state): State<ApiState>,
    Path(job_id): Path<String>,
) -> ApiResult<BacktestStatus> {
    let job_id = Uuid::parse_str(&job_id)?;
    Ok(Json(state.agent.backtest_status(job_id)?))
}

/// =============================
/// Router Setup
/// =============================

/// Routes served by the DeepQuant agent, relative to its mount point
pub fn agent_routes() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health))
        .route("/policies", post(create_policy).get(list_policies))
        .route("/policies/:policy_id", get(get_policy))
        .route("/backtests", post(start_backtest))
        .route("/backtests/:job_id", get(backtest_status))
}

/// Agent routes are served under `/api`, and again under the catalog
/// mount point when the DeepQuant agent is registered.
pub fn create_router(agent: Arc<DeepQuantAgent>, catalog: Arc<AgentCatalog>) -> Router {
    let mut router = Router::new()
        .route("/api/agents", get(list_agents))
        .nest("/api", agent_routes());

    if let Some(descriptor) = catalog.get(DEEPQUANT_SLUG) {
        router = router.nest(&descriptor.mount_path(), agent_routes());
    }

    let state = ApiState { agent, catalog };
    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    agent: Arc<DeepQuantAgent>,
    catalog: Arc<AgentCatalog>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(agent, catalog);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
