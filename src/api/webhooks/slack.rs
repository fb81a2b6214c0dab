//! Slack Events API webhook handler
//!
//! Authenticates each request, filters out bot traffic and ordinary chat,
//! and hands `!` commands to the dispatcher. The response never waits for
//! the worker, so Slack's three second deadline is not at risk.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;

use crate::api::ApiState;
use crate::dispatch::ForwardedCommand;
use crate::slack::events::SlackEnvelope;
use crate::slack::signature::{self, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::{Error, Result};

/// Tells Slack not to redeliver the event
pub const NO_RETRY_HEADER: &str = "x-slack-no-retry";

/// What became of an authenticated request
#[derive(Debug)]
enum Disposition {
    /// URL verification handshake
    Challenge(String),
    /// Ignored on purpose
    Dropped(&'static str),
    /// Command handed to the worker
    Dispatched,
}

/// Handle an incoming Slack event
pub async fn handle_event(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(e) = authenticate(&state, &headers, &body) {
        tracing::warn!(error = %e, "rejected Slack request");
        return no_retry(StatusCode::UNAUTHORIZED, "FAILED");
    }

    match process(&state, &body) {
        Ok(Disposition::Challenge(challenge)) => {
            tracing::info!("answered Slack URL verification");
            (StatusCode::OK, challenge).into_response()
        }
        Ok(Disposition::Dropped(reason)) => {
            tracing::debug!(reason, "Slack event dropped");
            (StatusCode::OK, "OK").into_response()
        }
        Ok(Disposition::Dispatched) => (StatusCode::OK, "OK").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Slack event handling failed");
            no_retry(StatusCode::INTERNAL_SERVER_ERROR, "ERROR")
        }
    }
}

fn no_retry(status: StatusCode, body: &'static str) -> Response {
    (status, [(NO_RETRY_HEADER, "1")], body).into_response()
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Signature(format!("missing {name} header")))
}

/// Verify the request signature and, when configured, its age
fn authenticate(state: &ApiState, headers: &HeaderMap, body: &[u8]) -> Result<()> {
    let timestamp = header(headers, TIMESTAMP_HEADER)?;
    let sig = header(headers, SIGNATURE_HEADER)?;

    if let Some(max_age) = state.max_request_age {
        signature::check_freshness(timestamp, chrono::Utc::now().timestamp(), max_age)?;
    }

    signature::verify(state.signing_secret.expose_secret(), timestamp, body, sig)
}

fn process(state: &ApiState, body: &[u8]) -> Result<Disposition> {
    let envelope: SlackEnvelope = serde_json::from_slice(body)
        .map_err(|e| Error::Envelope(format!("unreadable event body: {e}")))?;

    let event = match envelope {
        SlackEnvelope::UrlVerification { challenge } => {
            return Ok(Disposition::Challenge(challenge));
        }
        SlackEnvelope::EventCallback { event } => event,
        SlackEnvelope::Other => return Ok(Disposition::Dropped("unhandled envelope type")),
    };

    if event.is_bot() {
        return Ok(Disposition::Dropped("bot message"));
    }

    let Some(message) = event.command() else {
        return Ok(Disposition::Dropped("not a command"));
    };

    let (Some(channel_id), Some(user_id)) = (event.channel.clone(), event.user.clone()) else {
        return Err(Error::Envelope(
            "command event without channel or user".to_string(),
        ));
    };

    tracing::info!(channel = %channel_id, user = %user_id, "dispatching image command");

    state.dispatcher.dispatch(ForwardedCommand {
        channel_id,
        user_id,
        message: message.to_string(),
    })?;

    Ok(Disposition::Dispatched)
}
