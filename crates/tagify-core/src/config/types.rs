//! Sub-configuration structs with defaults.

use serde::{Deserialize, Serialize};

/// Default instruction sent alongside every image.
pub const DEFAULT_INSTRUCTION: &str = "Look at the image and list the words that come to mind. \
Answer with a single JSON object whose keys are consecutive numbers and whose values are \
the words, for example {\"1\": \"word\", \"2\": \"word\", \"3\": \"word\"}.";

/// Upload policy applied before the model is called.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Content types accepted from the uploader
    pub allowed_content_types: Vec<String>,

    /// Maximum declared upload size in bytes
    pub max_file_size_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_content_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
            ],
            max_file_size_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Vision-language model backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Backend identifier ("ollama")
    pub provider: String,

    /// Backend base URL; `${ENV_VAR}` references are resolved at startup
    pub endpoint: String,

    /// Model name as known to the backend
    pub name: String,

    /// Instruction text sent with each image
    pub instruction: String,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,

    /// Ask the backend to constrain output to JSON
    pub json_mode: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            name: "llava".to_string(),
            instruction: DEFAULT_INSTRUCTION.to_string(),
            // Vision models running locally can be slow
            timeout_ms: 120_000,
            json_mode: true,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level ("error", "warn", "info", "debug", "trace")
    pub level: String,

    /// Log format ("pretty" or "json")
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
