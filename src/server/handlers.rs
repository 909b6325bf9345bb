// HTTP request handlers

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::middleware::require_api_key;
use super::upload::upload_file;
use super::GatewayServer;
use crate::errors::{GatewayError, ValidationError};
use crate::tools::{ToolKind, ToolResponse};

/// Create the main application router
pub fn create_router(server: Arc<GatewayServer>) -> Router {
    // Authenticated API; the static upload route wins over the tool capture
    let api = Router::new()
        .route("/api/upload", post(upload_file))
        .route("/api/:tool", post(run_tool))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&server),
            require_api_key,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(api)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(server.config().max_upload_bytes))
        .with_state(server)
}

/// Handle POST /api/:tool - validate, dispatch, return the envelope
async fn run_tool(
    State(server): State<Arc<GatewayServer>>,
    Path(tool): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ToolResponse>, GatewayError> {
    let kind: ToolKind = tool.parse().map_err(|_| GatewayError::UnknownTool(tool))?;

    let Json(body) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected request body");
        ValidationError::NotAnObject
    })?;
    let body = body.as_object().ok_or(ValidationError::NotAnObject)?;

    let response = server.dispatcher().dispatch(kind, body).await?;
    Ok(Json(response))
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub started_at: String,
    pub uptime_seconds: u64,
    /// Whether each tool's installation directory exists
    pub tools: BTreeMap<String, bool>,
    /// Whether the cache backend answers
    pub cache: bool,
    pub cache_backend: String,
}

/// Handle GET /health - Health check endpoint (always 200)
pub async fn health_check(State(server): State<Arc<GatewayServer>>) -> Json<HealthStatus> {
    let dispatcher = server.dispatcher();

    let tools = dispatcher
        .registry()
        .presence()
        .into_iter()
        .map(|(kind, _, present)| (kind.as_str().to_string(), present))
        .collect();

    let uptime = chrono::Utc::now()
        .signed_duration_since(server.started_at())
        .num_seconds()
        .max(0) as u64;

    Json(HealthStatus {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        started_at: server.started_at().to_rfc3339(),
        uptime_seconds: uptime,
        tools,
        cache: dispatcher.cache().ping().await,
        cache_backend: dispatcher.cache().backend().to_string(),
    })
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Endpoint not found" })),
    )
        .into_response()
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            GatewayError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            GatewayError::Validation(_) | GatewayError::Upload(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            GatewayError::UnknownTool(_) => (StatusCode::NOT_FOUND, self.to_string()),
            GatewayError::Internal(e) => {
                tracing::error!(error = ?e, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
