//! Webhook endpoints for chat platforms

use std::sync::Arc;

use axum::{Router, routing::post};

use super::ApiState;

pub mod slack;

/// Build webhooks router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/slack/events", post(slack::handle_event))
        .with_state(state)
}
