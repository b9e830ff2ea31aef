//! Image generation: provider trait, failure classification, and the
//! retrying [`ImageClient`].
//!
//! ```text
//! illustrator ──► ImageClient::generate() ──► with_retry ──► ImageBackend::generate()
//!                   safe-prompt suffix          backoff          OpenAiImageBackend
//!                   credential check            classify         MockImageBackend
//! ```

pub mod client;
pub mod mock;
pub mod openai;

pub use client::{GeneratedImage, ImageClient, ImageFailure};
pub use mock::MockImageBackend;
pub use openai::OpenAiImageBackend;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

/// Why one image generation call failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// No API key is configured; no request was made.
    #[error("image provider API key is not configured")]
    MissingCredentials,

    /// The provider refused the prompt on safety grounds.
    #[error("prompt rejected by the image content policy: {0}")]
    ContentPolicy(String),

    /// The provider rejected the API key.
    #[error("image provider API key is invalid: {0}")]
    InvalidCredentials(String),

    /// The provider asked us to slow down.
    #[error("image provider rate limit reached: {0}")]
    RateLimited(String),

    /// Network failure, timeout, server error, or an unusable response.
    #[error("image generation failed: {0}")]
    Transient(String),
}

impl ImageError {
    /// Rate limits and transient failures are retried; rejections are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ImageError::RateLimited(_) | ImageError::Transient(_))
    }
}

/// Abstraction over image-generation providers.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn ImageBackend>`.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Generate one image for `prompt` and return a reference to it: a URL or
    /// a `data:` URL carrying the encoded bytes.
    async fn generate(&self, client: &Client, prompt: &str) -> Result<String, ImageError>;

    /// Whether credentials are configured. Checked before any request.
    fn has_credentials(&self) -> bool;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ImageError::RateLimited("slow down".into()).is_retryable());
        assert!(ImageError::Transient("timeout".into()).is_retryable());
        assert!(!ImageError::ContentPolicy("safety".into()).is_retryable());
        assert!(!ImageError::InvalidCredentials("bad key".into()).is_retryable());
        assert!(!ImageError::MissingCredentials.is_retryable());
    }
}
