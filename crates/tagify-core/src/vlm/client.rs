//! VLM client trait and backend factory.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ModelConfig;
use crate::error::PipelineError;
use crate::types::UploadedImage;

/// A single-shot call to a vision-language model.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (the pipeline holds an `Arc<dyn VlmClient>`).
#[async_trait]
pub trait VlmClient: Send + Sync {
    /// Send `instruction` plus the image to the model and return its text.
    ///
    /// The returned text is already normalized with [`trim_indent`](super::trim_indent).
    /// Any transport, status, or envelope problem is a `ModelInvocation` error.
    async fn invoke(
        &self,
        image: UploadedImage,
        instruction: &str,
    ) -> Result<String, PipelineError>;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok()
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Factory that creates the configured backend.
pub struct VlmClientFactory;

impl VlmClientFactory {
    /// Create a client for `config.provider`.
    pub fn create(config: &ModelConfig) -> Result<Arc<dyn VlmClient>, PipelineError> {
        match config.provider.as_str() {
            "ollama" => {
                let endpoint = resolve_env_var(&config.endpoint).ok_or_else(|| {
                    PipelineError::invocation(format!(
                        "Ollama endpoint not set ({}).",
                        config.endpoint
                    ))
                })?;
                Ok(Arc::new(super::ollama::OllamaClient::new(&endpoint, config)))
            }
            other => Err(PipelineError::invocation(format!(
                "Unknown VLM provider: {other}"
            ))),
        }
    }
}
