//! Slack Events API payloads

use serde::{Deserialize, Deserializer};

/// Character that marks a message as an image command
pub const COMMAND_MARKER: char = '!';

/// Outer envelope of an Events API request
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEnvelope {
    /// Endpoint ownership check sent when the request URL is configured
    UrlVerification {
        /// Value to echo back
        challenge: String,
    },
    /// A subscribed event
    EventCallback {
        /// The actual event
        event: SlackMessageEvent,
    },
    /// Other envelope types (ignored)
    #[serde(other)]
    Other,
}

/// Message event fields used by the relay
#[derive(Debug, Default, Deserialize)]
pub struct SlackMessageEvent {
    /// Channel ID
    pub channel: Option<String>,
    /// User ID
    pub user: Option<String>,
    /// Message text
    pub text: Option<String>,
    /// Bot ID (if from a bot)
    pub bot_id: Option<String>,
    /// Bot profile (if from a bot); `Some` whenever the key is present, even as `null`
    #[serde(default, deserialize_with = "present")]
    pub bot_profile: Option<serde_json::Value>,
}

/// Map any present value, `null` included, to `Some`
fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

impl SlackMessageEvent {
    /// Whether the message was posted by an automated participant
    #[must_use]
    pub const fn is_bot(&self) -> bool {
        self.bot_profile.is_some() || self.bot_id.is_some()
    }

    /// Command text when the message starts with [`COMMAND_MARKER`]
    #[must_use]
    pub fn command(&self) -> Option<&str> {
        self.text.as_deref().and_then(command_text)
    }
}

/// Strip the command marker, returning the remaining text
///
/// Returns `None` when the marker is missing or nothing but whitespace
/// follows it.
#[must_use]
pub fn command_text(text: &str) -> Option<&str> {
    text.strip_prefix(COMMAND_MARKER)
        .filter(|rest| !rest.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_callback() {
        let body = r#"{
            "type": "event_callback",
            "team_id": "T1",
            "event": {"type": "message", "channel": "C1", "user": "U1", "text": "!-prompt cat"}
        }"#;
        let envelope: SlackEnvelope = serde_json::from_str(body).unwrap();
        let SlackEnvelope::EventCallback { event } = envelope else {
            panic!("expected event callback");
        };
        assert_eq!(event.channel.as_deref(), Some("C1"));
        assert!(!event.is_bot());
        assert_eq!(event.command(), Some("-prompt cat"));
    }

    #[test]
    fn test_parse_url_verification() {
        let envelope: SlackEnvelope =
            serde_json::from_str(r#"{"type":"url_verification","token":"t","challenge":"abc"}"#)
                .unwrap();
        assert!(matches!(envelope, SlackEnvelope::UrlVerification { challenge } if challenge == "abc"));
    }

    #[test]
    fn test_unknown_envelope_type() {
        let envelope: SlackEnvelope =
            serde_json::from_str(r#"{"type":"app_rate_limited","minute_rate_limited":1}"#).unwrap();
        assert!(matches!(envelope, SlackEnvelope::Other));
    }

    #[test]
    fn test_bot_detection() {
        let event: SlackMessageEvent =
            serde_json::from_str(r#"{"text":"!hi","bot_profile":{"id":"B1"}}"#).unwrap();
        assert!(event.is_bot());
        let event: SlackMessageEvent = serde_json::from_str(r#"{"bot_id":"B1"}"#).unwrap();
        assert!(event.is_bot());
    }

    #[test]
    fn test_null_bot_profile_still_marks_bot() {
        let event: SlackMessageEvent =
            serde_json::from_str(r#"{"text":"!hi","bot_profile":null}"#).unwrap();
        assert!(event.is_bot());

        let event: SlackMessageEvent = serde_json::from_str(r#"{"text":"!hi"}"#).unwrap();
        assert!(!event.is_bot());
    }

    #[test]
    fn test_command_text() {
        assert_eq!(command_text("!-seed 3"), Some("-seed 3"));
        assert_eq!(command_text("!!loud"), Some("!loud"));
        assert_eq!(command_text("hello"), None);
        assert_eq!(command_text(" !late"), None);
        assert_eq!(command_text("!"), None);
        assert_eq!(command_text("!   "), None);
    }
}
