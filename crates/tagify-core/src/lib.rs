//! Tagify Core - Embeddable image-to-tags library.
//!
//! Tagify takes an uploaded image, asks a vision-language model to describe
//! it as a numbered JSON object, and returns the answer as a flat tag list.
//!
//! # Architecture
//!
//! The pipeline is transport-agnostic and stores nothing:
//!
//! ```text
//! UploadedImage → Validate (type, size) → VLM (Ollama) → Extract → Vec<String>
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use tagify_core::{Config, TaggingPipeline, UploadedImage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load()?;
//!     let pipeline = TaggingPipeline::from_config(&config)?;
//!
//!     let bytes = std::fs::read("./image.jpg")?;
//!     let tags = pipeline.run(UploadedImage::from_bytes(bytes, "image/jpeg")).await?;
//!     println!("Tags: {tags:?}");
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod types;
pub mod vlm;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, PipelineError};
pub use output::{OutputFormat, OutputWriter};
pub use pipeline::{ImageValidator, TagExtractor, TaggingPipeline};
pub use types::{TagList, TaggingResult, UploadedImage};
pub use vlm::{OllamaClient, VlmClient, VlmClientFactory};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
