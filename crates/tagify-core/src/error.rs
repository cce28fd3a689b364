//! Error types for the Tagify pipeline.
//!
//! Pipeline errors are split into client-input failures (the upload was
//! rejected) and dependency failures (the model backend misbehaved) so a host
//! can map them to its own status codes.

use thiserror::Error;

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised by a single tagging run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Declared content type is missing or not allowed
    #[error("Invalid file type: {}", content_type.as_deref().unwrap_or("<none>"))]
    InvalidFileType { content_type: Option<String> },

    /// Declared size exceeds the upload limit
    #[error("File too large: {size} bytes > {max_size} bytes")]
    FileTooLarge { size: u64, max_size: u64 },

    /// The model backend was unreachable, timed out, or replied unusably
    #[error("Model invocation failed: {message}")]
    ModelInvocation {
        message: String,
        /// HTTP status code, when the backend answered at all
        status_code: Option<u16>,
    },

    /// The model replied but its text is not a JSON object of tag strings
    #[error("Malformed model response: {message}")]
    MalformedModelResponse { message: String },
}

impl PipelineError {
    /// Whether the failure was caused by the uploaded input rather than the backend.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidFileType { .. } | PipelineError::FileTooLarge { .. }
        )
    }

    pub(crate) fn invocation(message: impl Into<String>) -> Self {
        PipelineError::ModelInvocation {
            message: message.into(),
            status_code: None,
        }
    }
}
