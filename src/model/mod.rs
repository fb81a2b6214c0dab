//! Image generation models
//!
//! [`ImageGenerator`] is the seam between the worker and a hosted model.
//! The only production implementation is [`TitanImageGenerator`].

mod titan;

pub use titan::{DEFAULT_MODEL_ID, TitanImageGenerator};

use async_trait::async_trait;

use crate::Result;
use crate::command::ImageParams;

/// Images requested per command
pub const NUMBER_OF_IMAGES: u32 = 1;

/// Generated image height in pixels
pub const IMAGE_HEIGHT: u32 = 512;

/// Generated image width in pixels
pub const IMAGE_WIDTH: u32 = 512;

/// A single text-to-image invocation
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub seed: u32,
    pub cfg_scale: f32,
    pub number_of_images: u32,
    pub height: u32,
    pub width: u32,
}

impl GenerationRequest {
    /// Apply the fixed generation policy to parsed parameters
    ///
    /// Returns `None` when there is no prompt to generate from.
    #[must_use]
    pub fn from_params(params: &ImageParams) -> Option<Self> {
        let prompt = params.prompt.clone()?;
        Some(Self {
            prompt,
            negative_prompt: params.negative_prompt.clone(),
            seed: params.seed,
            cfg_scale: params.cfg_scale,
            number_of_images: NUMBER_OF_IMAGES,
            height: IMAGE_HEIGHT,
            width: IMAGE_WIDTH,
        })
    }
}

/// Decoded image returned by a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Raw PNG bytes
    pub data: Vec<u8>,
}

/// Trait for text-to-image backends
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Model identifier, for status messages and logs
    fn model_id(&self) -> &str;

    /// Generate one image
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Model`] when the service rejects the call and
    /// [`crate::Error::ModelResponse`] when its answer holds no usable image
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage>;
}
