//! Gemini image-model client.
//!
//! Typed `generateContent` wire messages, response parsing, the HTTP
//! adapter, environment configuration, and the [`ImageGenerator`] trait
//! the studio pipeline is written against.

pub mod api;
pub mod config;
pub mod generator;
pub mod messages;

pub use api::{GeminiApi, GeminiError};
pub use config::{GeminiConfig, GeminiConfigError};
pub use generator::ImageGenerator;
pub use messages::{GeneratedAsset, GenerationOutput};
