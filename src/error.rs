//! Error types for the easel relay

use thiserror::Error;

/// Result type alias for easel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the relay
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Request signature missing, malformed, stale or wrong
    #[error("signature error: {0}")]
    Signature(String),

    /// Inbound event envelope could not be interpreted
    #[error("envelope error: {0}")]
    Envelope(String),

    /// Image model rejected the invocation
    #[error("model error {code}: {message}")]
    Model {
        /// Service error code (e.g. `ThrottlingException`)
        code: String,
        /// Service error message
        message: String,
    },

    /// Image model answered with something unusable
    #[error("model response error: {0}")]
    ModelResponse(String),

    /// Chat platform call failed
    #[error("chat error: {0}")]
    Chat(String),

    /// Hand-off to the worker failed
    #[error("dispatch error: {0}")]
    Dispatch(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
