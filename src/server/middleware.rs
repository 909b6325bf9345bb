// Middleware for API key authentication

use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::GatewayServer;
use crate::errors::GatewayError;

/// Header carrying the shared secret
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Deserialize)]
pub struct ApiKeyQuery {
    api_key: Option<String>,
}

/// Reject requests whose key (header first, then `?api_key=`) does not match
///
/// Runs before the body is read, so unauthenticated callers never reach the
/// dispatcher or the upload store.
pub async fn require_api_key(
    State(server): State<Arc<GatewayServer>>,
    query: Option<Query<ApiKeyQuery>>,
    request: Request,
    next: Next,
) -> Response {
    let supplied = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        // An unparseable query string counts as no key
        .or_else(|| query.and_then(|Query(query)| query.api_key));

    match supplied {
        Some(key) if key == server.config().api_key => next.run(request).await,
        _ => {
            tracing::warn!(path = %request.uri().path(), "Rejected request with invalid API key");
            GatewayError::Unauthorized.into_response()
        }
    }
}
