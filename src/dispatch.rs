//! Hand-off from the webhook receiver to the worker
//!
//! Dispatch is fire-and-forget: [`Dispatcher::dispatch`] returns as soon as
//! the command is submitted, and the receiver never learns how the worker
//! run ended.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::worker::Worker;
use crate::{Error, Result};

/// Command forwarded from the receiver to the worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardedCommand {
    /// Channel to answer in
    pub channel_id: String,
    /// User who sent the command
    pub user_id: String,
    /// Command text with the marker stripped
    pub message: String,
}

/// Submits forwarded commands for asynchronous processing
pub trait Dispatcher: Send + Sync {
    /// Submit a command without waiting for it to be processed
    ///
    /// # Errors
    ///
    /// Returns error if the command could not be submitted
    fn dispatch(&self, command: ForwardedCommand) -> Result<()>;
}

fn runtime() -> Result<tokio::runtime::Handle> {
    tokio::runtime::Handle::try_current()
        .map_err(|e| Error::Dispatch(format!("no async runtime: {e}")))
}

/// Runs the worker in a task on the current runtime
pub struct LocalDispatcher {
    worker: Arc<Worker>,
}

impl LocalDispatcher {
    #[must_use]
    pub const fn new(worker: Arc<Worker>) -> Self {
        Self { worker }
    }
}

impl Dispatcher for LocalDispatcher {
    fn dispatch(&self, command: ForwardedCommand) -> Result<()> {
        let worker = Arc::clone(&self.worker);
        runtime()?.spawn(async move {
            let outcome = worker.run(&command).await;
            tracing::info!(channel = %command.channel_id, ?outcome, "worker finished");
        });
        Ok(())
    }
}

/// Upper bound on a single forward to the remote worker
pub const FORWARD_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts commands to a remote worker endpoint
#[derive(Clone)]
pub struct HttpDispatcher {
    client: reqwest::Client,
    url: String,
    token: Option<SecretString>,
}

impl HttpDispatcher {
    /// Create a dispatcher targeting a worker URL (e.g. `https://host/worker`)
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(url: impl Into<String>, token: Option<SecretString>) -> Result<Self> {
        Self::with_timeout(url, token, FORWARD_TIMEOUT)
    }

    /// Create a dispatcher whose forwards give up after `timeout`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn with_timeout(
        url: impl Into<String>,
        token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Dispatch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            token,
        })
    }

    /// Post a command and wait for the worker to accept it
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, times out or is refused
    pub async fn forward(&self, command: &ForwardedCommand) -> Result<()> {
        let mut request = self.client.post(&self.url).json(command);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Dispatch(format!("failed to forward command: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Dispatch(format!("worker refused command: {status}")));
        }

        Ok(())
    }
}

impl Dispatcher for HttpDispatcher {
    fn dispatch(&self, command: ForwardedCommand) -> Result<()> {
        let dispatcher = self.clone();

        runtime()?.spawn(async move {
            match dispatcher.forward(&command).await {
                Ok(()) => {
                    tracing::debug!(url = %dispatcher.url, channel = %command.channel_id, "command forwarded");
                }
                Err(e) => {
                    tracing::error!(url = %dispatcher.url, error = %e, "command not forwarded");
                }
            }
        });
        Ok(())
    }
}
