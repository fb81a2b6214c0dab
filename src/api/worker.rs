//! Internal endpoint that accepts forwarded commands
//!
//! A receiver configured with a remote worker URL posts each command here.
//! The command runs in the background and the caller gets `202 Accepted`
//! straight away.

use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};

use super::{ApiState, auth};
use crate::dispatch::ForwardedCommand;

/// Build worker router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/worker", post(handle_command))
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_worker_token,
        ))
        .with_state(state)
}

/// Accept a forwarded command and run it in the background
async fn handle_command(
    State(state): State<Arc<ApiState>>,
    Json(command): Json<ForwardedCommand>,
) -> StatusCode {
    let Some(worker) = state.worker.clone() else {
        tracing::warn!("forwarded command received but no worker is configured");
        return StatusCode::SERVICE_UNAVAILABLE;
    };

    tracing::debug!(channel = %command.channel_id, "forwarded command accepted");

    tokio::spawn(async move {
        let outcome = worker.run(&command).await;
        tracing::info!(channel = %command.channel_id, ?outcome, "worker finished");
    });

    StatusCode::ACCEPTED
}
