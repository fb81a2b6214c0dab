//! Configuration for the easel relay
//!
//! All settings come from the environment and are read once at startup.

use std::time::Duration;

use secrecy::SecretString;

use crate::model::DEFAULT_MODEL_ID;
use crate::slack::SLACK_API_URL;
use crate::{Error, Result};

/// Default replay window for signed requests
pub const DEFAULT_MAX_REQUEST_AGE: Duration = Duration::from_secs(300);

/// Easel configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Slack credentials and endpoints
    pub slack: SlackConfig,

    /// Image model selection
    pub model: ModelConfig,

    /// Remote worker hand-off
    pub worker: WorkerConfig,
}

/// Slack configuration
#[derive(Debug, Clone)]
pub struct SlackConfig {
    /// Signing secret used to authenticate inbound events
    /// Set via `SLACK_SIGNING_SECRET`
    pub signing_secret: Option<SecretString>,

    /// Bot token used for the Web API
    /// Set via `SLACK_BOT_TOKEN`
    pub bot_token: Option<SecretString>,

    /// Web API base URL
    pub api_url: String,

    /// Reject signed requests older than this (`None` disables the check)
    pub max_request_age: Option<Duration>,
}

/// Image model configuration
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Bedrock model id
    pub model_id: String,

    /// AWS region, falling back to the SDK's provider chain when unset
    pub region: Option<String>,
}

/// Worker hand-off configuration
#[derive(Debug, Clone, Default)]
pub struct WorkerConfig {
    /// Remote worker endpoint; commands run in-process when unset
    pub url: Option<String>,

    /// Bearer token shared between receiver and remote worker
    pub token: Option<SecretString>,
}

impl Config {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to an invalid value
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to an invalid value
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let secret = |key: &str| var(key).map(SecretString::from);

        let max_request_age = match var("SLACK_MAX_REQUEST_AGE_SECS") {
            None => Some(DEFAULT_MAX_REQUEST_AGE),
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    Error::Config(format!("SLACK_MAX_REQUEST_AGE_SECS is not a number: {raw}"))
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
        };

        Ok(Self {
            slack: SlackConfig {
                signing_secret: secret("SLACK_SIGNING_SECRET"),
                bot_token: secret("SLACK_BOT_TOKEN"),
                api_url: var("SLACK_API_URL").unwrap_or_else(|| SLACK_API_URL.to_string()),
                max_request_age,
            },
            model: ModelConfig {
                model_id: var("EASEL_MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
                region: var("AWS_REGION"),
            },
            worker: WorkerConfig {
                url: var("EASEL_WORKER_URL"),
                token: secret("EASEL_WORKER_TOKEN"),
            },
        })
    }

    /// Signing secret, required to accept webhooks
    ///
    /// # Errors
    ///
    /// Returns error if `SLACK_SIGNING_SECRET` is unset
    pub fn signing_secret(&self) -> Result<SecretString> {
        self.slack
            .signing_secret
            .clone()
            .ok_or_else(|| Error::Config("SLACK_SIGNING_SECRET is not set".to_string()))
    }

    /// Bot token, required to run the worker
    ///
    /// # Errors
    ///
    /// Returns error if `SLACK_BOT_TOKEN` is unset
    pub fn bot_token(&self) -> Result<SecretString> {
        self.slack
            .bot_token
            .clone()
            .ok_or_else(|| Error::Config("SLACK_BOT_TOKEN is not set".to_string()))
    }
}
