//! HTTP API server for easel

mod auth;
pub mod health;
pub mod webhooks;
pub mod worker;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use secrecy::SecretString;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::dispatch::Dispatcher;
use crate::worker::Worker;

/// Shared state for API handlers
pub struct ApiState {
    /// Slack signing secret for inbound events
    pub signing_secret: SecretString,
    /// Replay window for signed requests (`None` disables the check)
    pub max_request_age: Option<Duration>,
    /// Where accepted commands are handed off
    pub dispatcher: Arc<dyn Dispatcher>,
    /// Worker serving `POST /worker`, if this instance runs one
    pub worker: Option<Arc<Worker>>,
    /// Bearer token required on `POST /worker`
    pub worker_token: Option<SecretString>,
}

/// Build the full application router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .merge(webhooks::router(Arc::clone(&state)))
        .merge(worker::router(state))
        .merge(health::router())
        .layer(TraceLayer::new_for_http())
}

/// HTTP API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Create a new API server
    #[must_use]
    pub const fn new(state: Arc<ApiState>, port: u16) -> Self {
        Self { state, port }
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(
            port = self.port,
            worker = self.state.worker.is_some(),
            "API server listening"
        );

        axum::serve(listener, router(self.state))
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}
