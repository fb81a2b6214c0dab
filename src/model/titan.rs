//! Amazon Titan Image Generator on Bedrock

use std::time::Duration;

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_bedrockruntime::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_bedrockruntime::primitives::Blob;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::{GeneratedImage, GenerationRequest, ImageGenerator};
use crate::{Error, Result};

/// Default Bedrock model id
pub const DEFAULT_MODEL_ID: &str = "amazon.titan-image-generator-v1";

/// Image generation can take well over a minute under load
const INVOKE_TIMEOUT: Duration = Duration::from_secs(120);

/// Titan image generator backed by the Bedrock runtime API
pub struct TitanImageGenerator {
    client: aws_sdk_bedrockruntime::Client,
    model_id: String,
}

impl TitanImageGenerator {
    /// Create a generator from an existing Bedrock runtime client
    #[must_use]
    pub const fn new(client: aws_sdk_bedrockruntime::Client, model_id: String) -> Self {
        Self { client, model_id }
    }

    /// Create a generator from the ambient AWS configuration
    ///
    /// Credentials come from the default provider chain. SDK retries are
    /// disabled: a failed generation is reported, not repeated.
    pub async fn from_env(region: Option<String>, model_id: String) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .timeout_config(
                TimeoutConfig::builder()
                    .connect_timeout(INVOKE_TIMEOUT)
                    .read_timeout(INVOKE_TIMEOUT)
                    .build(),
            )
            .retry_config(RetryConfig::disabled());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let config = loader.load().await;

        tracing::debug!(region = ?config.region(), model_id = %model_id, "Bedrock client configured");

        Self::new(aws_sdk_bedrockruntime::Client::new(&config), model_id)
    }
}

#[async_trait]
impl ImageGenerator for TitanImageGenerator {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        let body = serde_json::to_vec(&TitanRequest::from(request))?;

        let response = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| Error::Model {
                code: e.code().unwrap_or("Unknown").to_string(),
                message: e
                    .message()
                    .map_or_else(|| DisplayErrorContext(&e).to_string(), ToString::to_string),
            })?;

        decode_response(response.body().as_ref())
    }
}

/// Titan `TEXT_IMAGE` request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TitanRequest<'a> {
    task_type: &'static str,
    text_to_image_params: TextToImageParams<'a>,
    image_generation_config: ImageGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextToImageParams<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_text: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageGenerationConfig {
    number_of_images: u32,
    cfg_scale: f32,
    height: u32,
    width: u32,
    seed: u32,
}

impl<'a> From<&'a GenerationRequest> for TitanRequest<'a> {
    fn from(request: &'a GenerationRequest) -> Self {
        Self {
            task_type: "TEXT_IMAGE",
            text_to_image_params: TextToImageParams {
                text: &request.prompt,
                negative_text: request.negative_prompt.as_deref(),
            },
            image_generation_config: ImageGenerationConfig {
                number_of_images: request.number_of_images,
                cfg_scale: request.cfg_scale,
                height: request.height,
                width: request.width,
                seed: request.seed,
            },
        }
    }
}

/// Titan response body
#[derive(Debug, Deserialize)]
struct TitanResponse {
    #[serde(default)]
    images: Vec<String>,
    error: Option<String>,
}

/// Extract and decode the first image of a Titan response
fn decode_response(body: &[u8]) -> Result<GeneratedImage> {
    let response: TitanResponse = serde_json::from_slice(body)
        .map_err(|e| Error::ModelResponse(format!("unreadable response: {e}")))?;

    if let Some(error) = response.error.filter(|e| !e.is_empty()) {
        return Err(Error::ModelResponse(error));
    }

    let encoded = response
        .images
        .into_iter()
        .next()
        .ok_or_else(|| Error::ModelResponse("response contains no images".to_string()))?;

    let data = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| Error::ModelResponse(format!("image is not valid base64: {e}")))?;

    Ok(GeneratedImage { data })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(negative: Option<&str>) -> GenerationRequest {
        GenerationRequest {
            prompt: "a red bicycle".to_string(),
            negative_prompt: negative.map(ToString::to_string),
            seed: 42,
            cfg_scale: 8.0,
            number_of_images: 1,
            height: 512,
            width: 512,
        }
    }

    #[test]
    fn test_payload_shape() {
        let request = request(Some("people"));
        let json = serde_json::to_value(TitanRequest::from(&request)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "taskType": "TEXT_IMAGE",
                "textToImageParams": {"text": "a red bicycle", "negativeText": "people"},
                "imageGenerationConfig": {
                    "numberOfImages": 1,
                    "cfgScale": 8.0,
                    "height": 512,
                    "width": 512,
                    "seed": 42
                }
            })
        );
    }

    #[test]
    fn test_payload_omits_absent_negative_text() {
        let request = request(None);
        let json = serde_json::to_value(TitanRequest::from(&request)).unwrap();
        assert!(json["textToImageParams"].get("negativeText").is_none());
    }

    #[test]
    fn test_decode_first_image() {
        let body = br#"{"images": ["iVBORw0KGgo=", "AAAA"], "error": null}"#;
        let image = decode_response(body).unwrap();
        assert_eq!(image.data, b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_decode_failures() {
        assert!(matches!(
            decode_response(br#"{"images": []}"#),
            Err(Error::ModelResponse(_))
        ));
        assert!(matches!(
            decode_response(br#"{"images": ["not base64!"]}"#),
            Err(Error::ModelResponse(_))
        ));
        assert!(matches!(
            decode_response(br#"{"images": [], "error": "content filtered"}"#),
            Err(Error::ModelResponse(msg)) if msg == "content filtered"
        ));
        assert!(matches!(decode_response(b"<html>"), Err(Error::ModelResponse(_))));
    }
}
