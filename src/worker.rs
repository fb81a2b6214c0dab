//! Stage-two worker: command text in, image in the channel out
//!
//! A worker run never fails from the caller's point of view. Everything
//! that goes wrong is logged, optionally reported to the channel, and
//! summarised in the returned [`WorkOutcome`].

use std::sync::Arc;
use std::time::Instant;

use crate::command::{self, ImageParams};
use crate::dispatch::ForwardedCommand;
use crate::model::{GenerationRequest, ImageGenerator};
use crate::slack::SlackClient;

/// How a worker run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOutcome {
    /// Image generated and shared in the channel
    Delivered,
    /// Command parsed but carried no usable prompt
    NoPrompt,
    /// Command text could not be parsed
    InvalidCommand,
    /// The model produced no image
    ModelFailed,
    /// The image was generated but could not be shared
    UploadFailed,
}

/// Runs forwarded commands against an image model and posts results to Slack
pub struct Worker {
    slack: SlackClient,
    generator: Arc<dyn ImageGenerator>,
}

impl Worker {
    /// Create a new worker
    #[must_use]
    pub fn new(slack: SlackClient, generator: Arc<dyn ImageGenerator>) -> Self {
        Self { slack, generator }
    }

    /// Process one forwarded command
    pub async fn run(&self, command: &ForwardedCommand) -> WorkOutcome {
        let channel = command.channel_id.as_str();

        tracing::info!(
            channel,
            user = %command.user_id,
            message = %command.message,
            "processing image command"
        );

        let parsed = match command::parse_command(&command.message) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(channel, error = %e, "command parse failed");
                self.notify_code(channel, &format!("Could not parse command: {e}"))
                    .await;
                return WorkOutcome::InvalidCommand;
            }
        };

        if !parsed.unknown.is_empty() {
            tracing::debug!(channel, unknown = ?parsed.unknown, "unknown arguments");
            self.notify_code(channel, "Unknown arguments in message").await;
        }

        let Some(request) = GenerationRequest::from_params(&parsed.params) else {
            tracing::info!(channel, "no usable prompt, nothing to generate");
            return WorkOutcome::NoPrompt;
        };

        self.notify_code(
            channel,
            &status_line(self.generator.model_id(), &parsed.params, &request),
        )
        .await;

        let started = Instant::now();
        let image = match self.generator.generate(&request).await {
            Ok(image) => image,
            Err(e) => {
                tracing::error!(
                    channel,
                    model_id = self.generator.model_id(),
                    error = %e,
                    "image generation failed"
                );
                return WorkOutcome::ModelFailed;
            }
        };
        let elapsed = started.elapsed().as_secs();

        tracing::info!(channel, bytes = image.data.len(), elapsed_secs = elapsed, "image generated");

        let filename = unique_file_name("png");
        let title = format!("{filename} [generated in {elapsed} seconds]");

        match self
            .slack
            .upload_file(channel, &filename, &image.data, &title)
            .await
        {
            Ok(_) => WorkOutcome::Delivered,
            Err(e) => {
                tracing::error!(channel, filename = %filename, error = %e, "image upload failed");
                WorkOutcome::UploadFailed
            }
        }
    }

    async fn notify_code(&self, channel: &str, text: &str) {
        if let Err(e) = self.slack.post_code_block(channel, text).await {
            tracing::warn!(channel, error = %e, "failed to post status message");
        }
    }
}

/// Summary posted before generation starts
fn status_line(model_id: &str, params: &ImageParams, request: &GenerationRequest) -> String {
    format!(
        "modelId:{model_id}, prompt:{}, negativePrompt:{}, seed:{}, numberOfImages:{}, cfgscale:{}, height:{}, width:{}",
        request.prompt,
        params.negative_prompt.as_deref().unwrap_or("None"),
        request.seed,
        request.number_of_images,
        request.cfg_scale,
        request.height,
        request.width,
    )
}

/// File name from the current unix time, e.g. `1712345678.png`
fn unique_file_name(extension: &str) -> String {
    format!("{}.{extension}", chrono::Utc::now().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line() {
        let params = ImageParams {
            prompt: Some("a lighthouse".to_string()),
            ..ImageParams::default()
        };
        let request = GenerationRequest::from_params(&params).unwrap();
        assert_eq!(
            status_line("amazon.titan-image-generator-v1", &params, &request),
            "modelId:amazon.titan-image-generator-v1, prompt:a lighthouse, negativePrompt:None, \
             seed:0, numberOfImages:1, cfgscale:8, height:512, width:512"
        );
    }

    #[test]
    fn test_status_line_fractional_cfg_scale() {
        let params = ImageParams {
            prompt: Some("a lighthouse".to_string()),
            negative_prompt: Some("fog".to_string()),
            seed: 7,
            cfg_scale: 6.5,
        };
        let request = GenerationRequest::from_params(&params).unwrap();
        let line = status_line("m", &params, &request);
        assert!(line.contains("negativePrompt:fog"));
        assert!(line.contains("seed:7"));
        assert!(line.contains("cfgscale:6.5"));
    }

    #[test]
    fn test_unique_file_name() {
        let name = unique_file_name("png");
        let stem = name.strip_suffix(".png").unwrap();
        assert!(stem.parse::<i64>().unwrap() > 1_600_000_000);
    }
}
