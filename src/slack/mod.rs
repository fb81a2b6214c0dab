//! Slack Web API client
//!
//! Posts status messages with `chat.postMessage` and delivers images with
//! Slack's external upload flow:
//!
//! 1. `files.getUploadURLExternal` reserves a file id and an upload URL
//! 2. the raw bytes are posted to that URL
//! 3. `files.completeUploadExternal` attaches the file to a channel
//!
//! Inbound traffic (Events API) is described in [`events`] and authenticated
//! with [`signature`].

pub mod events;
pub mod signature;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default Slack Web API base URL
pub const SLACK_API_URL: &str = "https://slack.com/api";

/// Slack Web API client authenticated with a bot token
pub struct SlackClient {
    bot_token: SecretString,
    api_url: String,
    client: reqwest::Client,
}

/// Slack API response wrapper
#[derive(Debug, Deserialize)]
struct SlackResponse<T> {
    ok: bool,
    error: Option<String>,
    #[serde(flatten)]
    data: Option<T>,
}

/// Chat post message request (simple text)
#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
}

/// Chat post message request with blocks
#[derive(Debug, Serialize)]
struct PostMessageWithBlocksRequest<'a> {
    channel: &'a str,
    text: &'a str,
    blocks: Vec<SlackBlock>,
}

/// Slack Block Kit block
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum SlackBlock {
    #[serde(rename = "section")]
    Section { text: SlackText },
}

/// Slack Block Kit text object
#[derive(Debug, Serialize)]
struct SlackText {
    #[serde(rename = "type")]
    text_type: &'static str,
    text: String,
}

/// Step 1 response: where to send the bytes
#[derive(Debug, Deserialize)]
struct UploadUrlResponse {
    upload_url: String,
    file_id: String,
}

/// Step 3 request: attach uploaded files to a channel
#[derive(Debug, Serialize)]
struct CompleteUploadRequest<'a> {
    channel_id: &'a str,
    files: [UploadedFile<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UploadedFile<'a> {
    id: &'a str,
    title: &'a str,
}

impl SlackClient {
    /// Create a client for the public Slack API
    ///
    /// # Arguments
    ///
    /// * `bot_token` - Slack bot OAuth token (xoxb-...)
    #[must_use]
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            api_url: SLACK_API_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the client at a different API base URL
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Post a plain text message
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or Slack answers `ok: false`
    pub async fn post_message(&self, channel: &str, text: &str) -> Result<()> {
        self.post_chat(&PostMessageRequest { channel, text }).await?;
        tracing::debug!(channel, "Slack message sent");
        Ok(())
    }

    /// Post text rendered as inline code
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or Slack answers `ok: false`
    pub async fn post_code_block(&self, channel: &str, text: &str) -> Result<()> {
        let request = PostMessageWithBlocksRequest {
            channel,
            text,
            blocks: vec![SlackBlock::Section {
                text: SlackText {
                    text_type: "mrkdwn",
                    text: format!("`{text}`"),
                },
            }],
        };
        self.post_chat(&request).await?;
        tracing::debug!(channel, "Slack code block sent");
        Ok(())
    }

    async fn post_chat<T: Serialize + Sync>(&self, request: &T) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.api_url))
            .bearer_auth(self.bot_token.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Chat(format!("Slack request failed: {e}")))?;

        let result: SlackResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| Error::Chat(format!("Slack parse error: {e}")))?;

        if !result.ok {
            return Err(Error::Chat(format!(
                "Slack send failed: {}",
                result.error.unwrap_or_default()
            )));
        }

        Ok(())
    }

    /// Upload a file and share it in a channel
    ///
    /// Runs the three-step external upload. A failing step abandons the
    /// remaining ones; a file reserved in step 1 is left to expire.
    /// Returns the Slack file id.
    ///
    /// # Errors
    ///
    /// Returns error naming the step that failed
    pub async fn upload_file(
        &self,
        channel: &str,
        filename: &str,
        data: &[u8],
        title: &str,
    ) -> Result<String> {
        let target = self.request_upload_url(filename, data.len()).await?;
        tracing::debug!(file_id = %target.file_id, "Slack upload URL reserved");

        let response = self
            .client
            .post(&target.upload_url)
            .bearer_auth(self.bot_token.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| Error::Chat(format!("Slack file upload failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Chat(format!("Slack file upload rejected: {status}")));
        }

        self.complete_upload(channel, &target.file_id, title).await?;

        tracing::info!(channel, file_id = %target.file_id, bytes = data.len(), "Slack file shared");
        Ok(target.file_id)
    }

    async fn request_upload_url(&self, filename: &str, length: usize) -> Result<UploadUrlResponse> {
        let length = length.to_string();
        let response = self
            .client
            .get(format!("{}/files.getUploadURLExternal", self.api_url))
            .bearer_auth(self.bot_token.expose_secret())
            .query(&[("filename", filename), ("length", length.as_str())])
            .send()
            .await
            .map_err(|e| Error::Chat(format!("Slack upload URL request failed: {e}")))?;

        let result: SlackResponse<UploadUrlResponse> = response
            .json()
            .await
            .map_err(|e| Error::Chat(format!("Slack upload URL parse error: {e}")))?;

        if !result.ok {
            return Err(Error::Chat(format!(
                "Slack upload URL request refused: {}",
                result.error.unwrap_or_default()
            )));
        }

        result
            .data
            .ok_or_else(|| Error::Chat("Slack upload URL response missing upload_url".to_string()))
    }

    async fn complete_upload(&self, channel: &str, file_id: &str, title: &str) -> Result<()> {
        let request = CompleteUploadRequest {
            channel_id: channel,
            files: [UploadedFile { id: file_id, title }],
        };

        let response = self
            .client
            .post(format!("{}/files.completeUploadExternal", self.api_url))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Chat(format!("Slack upload completion failed: {e}")))?;

        let result: SlackResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| Error::Chat(format!("Slack upload completion parse error: {e}")))?;

        if !result.ok {
            return Err(Error::Chat(format!(
                "Slack upload completion refused: {}",
                result.error.unwrap_or_default()
            )));
        }

        Ok(())
    }
}
