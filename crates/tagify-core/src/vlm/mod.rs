//! Vision-language model integration.
//!
//! Provides the `VlmClient` abstraction, the Ollama backend, and the factory
//! that picks a backend from config.

pub(crate) mod client;
pub(crate) mod ollama;
pub(crate) mod text;

pub use client::{resolve_env_var, VlmClient, VlmClientFactory};
pub use ollama::OllamaClient;
pub use text::trim_indent;
