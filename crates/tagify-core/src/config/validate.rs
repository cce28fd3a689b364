//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.upload.allowed_content_types.is_empty() {
            return Err(ConfigError::ValidationError(
                "upload.allowed_content_types must not be empty".into(),
            ));
        }
        if self.upload.max_file_size_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "upload.max_file_size_bytes must be > 0".into(),
            ));
        }
        if self.model.endpoint.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "model.endpoint must not be empty".into(),
            ));
        }
        if self.model.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "model.name must not be empty".into(),
            ));
        }
        if self.model.instruction.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "model.instruction must not be empty".into(),
            ));
        }
        if self.model.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "model.timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }
}
