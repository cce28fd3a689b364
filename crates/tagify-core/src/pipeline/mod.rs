//! The image-to-tags pipeline.
//!
//! ```text
//! UploadedImage → Validate → VLM → Extract → TagList
//! ```
//!
//! Each run is independent. The pipeline holds only read-only configuration
//! and a shared client, so one instance can serve concurrent runs.

pub mod extract;
pub mod validate;

pub use extract::TagExtractor;
pub use validate::{detect_content_type, ImageValidator};

use std::sync::Arc;
use std::time::Instant;

use crate::config::{Config, ModelConfig, UploadConfig};
use crate::error::PipelineError;
use crate::types::{TagList, TaggingResult, UploadedImage};
use crate::vlm::{VlmClient, VlmClientFactory};

/// Validate → invoke → extract, with no partial results.
pub struct TaggingPipeline {
    validator: ImageValidator,
    client: Arc<dyn VlmClient>,
    extractor: TagExtractor,
    instruction: String,
}

impl TaggingPipeline {
    /// Create a pipeline around an existing client.
    pub fn new(
        upload: &UploadConfig,
        instruction: impl Into<String>,
        client: Arc<dyn VlmClient>,
    ) -> Self {
        Self {
            validator: ImageValidator::new(upload),
            client,
            extractor: TagExtractor,
            instruction: instruction.into(),
        }
    }

    /// Create a pipeline with the backend named in `config.model`.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        Self::with_model(&config.upload, &config.model)
    }

    /// Create a pipeline from the upload policy and model settings.
    pub fn with_model(upload: &UploadConfig, model: &ModelConfig) -> Result<Self, PipelineError> {
        let client = VlmClientFactory::create(model)?;
        tracing::debug!(provider = %model.provider, model = %model.name, "VLM client ready");
        Ok(Self::new(upload, model.instruction.clone(), client))
    }

    /// Tag an image.
    pub async fn run(&self, image: UploadedImage) -> Result<TagList, PipelineError> {
        let start = Instant::now();

        if let Err(e) = self.validator.validate(&image) {
            tracing::warn!(
                content_type = image.content_type().unwrap_or("<none>"),
                size = image.size(),
                "Rejected upload: {e}"
            );
            return Err(e);
        }

        let raw = self.client.invoke(image, &self.instruction).await?;
        let tags = self.extractor.extract(&raw)?;

        tracing::info!(
            tags = tags.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Tagged image"
        );
        Ok(tags)
    }

    /// Tag an image and stamp the caller's metadata onto the result.
    pub async fn run_enriched(
        &self,
        image: UploadedImage,
        name: impl Into<String>,
        url: impl Into<String>,
        owner: impl Into<String>,
    ) -> Result<TaggingResult, PipelineError> {
        let tags = self.run(image).await?;
        Ok(TaggingResult {
            name: name.into(),
            url: url.into(),
            owner: owner.into(),
            tags,
        })
    }

    /// The instruction sent with every image.
    pub fn instruction(&self) -> &str {
        &self.instruction
    }
}
