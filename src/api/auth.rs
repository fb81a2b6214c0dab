//! Bearer token middleware for the internal worker endpoint

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use secrecy::ExposeSecret;

use super::ApiState;

/// Extract bearer token from Authorization header
fn extract_bearer(req: &Request) -> Option<&str> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Middleware to verify the worker token
pub async fn require_worker_token(
    State(state): State<Arc<ApiState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // No token configured: the endpoint is expected to sit on a private network
    let Some(expected) = &state.worker_token else {
        return Ok(next.run(req).await);
    };

    match extract_bearer(&req) {
        Some(token) if token == expected.expose_secret() => Ok(next.run(req).await),
        Some(_) => {
            tracing::warn!("invalid worker token provided");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            tracing::debug!("no worker token provided");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
