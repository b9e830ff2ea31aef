//! Retrying image client.

use super::{ImageBackend, ImageError};
use crate::backend::BackoffConfig;
use crate::exec_ctx::ExecCtx;
use crate::retry::{with_retry, RetryDecision, RetryPolicy};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Appended to every prompt to keep text and watermarks out of the image.
pub const SAFE_PROMPT_SUFFIX: &str =
    ". No text, no words, no letters, no watermarks. Clean, professional blog image.";

/// A generated image and the attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// URL or `data:` URL of the image.
    pub url: String,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}

/// Terminal failure of one image after the client gave up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("image generation failed after {attempts} attempt(s): {error}")]
pub struct ImageFailure {
    /// The last error seen.
    pub error: ImageError,
    /// Attempts made; zero when credentials were missing.
    pub attempts: u32,
}

/// Wraps an [`ImageBackend`] with credential checks, prompt hardening,
/// bounded retry and failure classification.
///
/// # Example
///
/// ```
/// use article_pipeline::image::{ImageClient, MockImageBackend};
/// use std::sync::Arc;
///
/// let client = ImageClient::new(Arc::new(MockImageBackend::always("u")), reqwest::Client::new())
///     .with_retries(2);
/// assert_eq!(client.retries(), 2);
/// ```
#[derive(Clone)]
pub struct ImageClient {
    backend: Arc<dyn ImageBackend>,
    client: Client,
    backoff: BackoffConfig,
    retries: u32,
    delay: Duration,
}

impl std::fmt::Debug for ImageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageClient")
            .field("backend", &self.backend.name())
            .field("backoff", &self.backoff)
            .field("retries", &self.retries)
            .field("delay", &self.delay)
            .finish()
    }
}

impl ImageClient {
    /// Create a client with 3 attempts per image and a 1 second pause
    /// between batch items.
    pub fn new(backend: Arc<dyn ImageBackend>, client: Client) -> Self {
        Self {
            backend,
            client,
            backoff: BackoffConfig::images(),
            retries: 3,
            delay: Duration::from_secs(1),
        }
    }

    /// A client over the context's image backend and HTTP client.
    pub fn from_ctx(ctx: &ExecCtx) -> Self {
        Self::new(ctx.images.clone(), ctx.client.clone())
    }

    /// Set the attempt budget per image (minimum 1).
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries.max(1);
        self
    }

    /// Replace the backoff schedule.
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the pause between items in [`generate_many`](Self::generate_many).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Attempt budget per image.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Generate one image with the configured attempt budget.
    pub async fn generate(&self, prompt: &str) -> Result<GeneratedImage, ImageFailure> {
        self.generate_with_retries(prompt, self.retries).await
    }

    /// Generate one image with up to `retries` attempts.
    ///
    /// Missing credentials fail with zero attempts. Content-policy and
    /// credential rejections stop at once. Rate limits wait
    /// `backoff(attempt + 1)`, longer than the `backoff(attempt - 1)` used for
    /// other transient failures.
    pub async fn generate_with_retries(
        &self,
        prompt: &str,
        retries: u32,
    ) -> Result<GeneratedImage, ImageFailure> {
        if !self.backend.has_credentials() {
            warn!(backend = self.backend.name(), "image generation skipped: no credentials");
            return Err(ImageFailure {
                error: ImageError::MissingCredentials,
                attempts: 0,
            });
        }

        let safe = safe_prompt(prompt);
        let safe = safe.as_str();
        let backend = &self.backend;
        let client = &self.client;
        let backoff = &self.backoff;
        let policy = RetryPolicy::new(retries).with_backoff(backoff.clone());

        let outcome = with_retry(
            &policy,
            |attempt, _| async move {
                debug!(attempt, max_attempts = retries, "generating image");
                backend.generate(client, safe).await
            },
            |result, attempt| match result {
                Ok(_) => RetryDecision::Done,
                Err(e) => {
                    warn!(attempt, max_attempts = retries, error = %e, "image attempt failed");
                    match e {
                        ImageError::RateLimited(_) => {
                            RetryDecision::RetryAfter(backoff.delay_for_attempt(attempt + 1))
                        }
                        e if e.is_retryable() => RetryDecision::Retry,
                        _ => RetryDecision::Done,
                    }
                }
            },
        )
        .await;

        match outcome.result {
            Ok(url) => {
                info!(attempts = outcome.attempts, "image generated");
                Ok(GeneratedImage {
                    url,
                    attempts: outcome.attempts,
                })
            }
            Err(error) => Err(ImageFailure {
                error,
                attempts: outcome.attempts,
            }),
        }
    }

    /// Generate images one at a time, reporting `(index, total)` before each
    /// and pausing between items. Failed prompts yield `None`.
    pub async fn generate_many<F>(&self, prompts: &[String], mut on_progress: F) -> Vec<Option<String>>
    where
        F: FnMut(usize, usize),
    {
        let total = prompts.len();
        let mut results = Vec::with_capacity(total);
        for (i, prompt) in prompts.iter().enumerate() {
            on_progress(i + 1, total);
            results.push(self.generate(prompt).await.ok().map(|image| image.url));
            if i + 1 < total {
                tokio::time::sleep(self.delay).await;
            }
        }
        results
    }
}

/// The prompt actually sent to the provider.
pub fn safe_prompt(prompt: &str) -> String {
    format!("{}{}", prompt, SAFE_PROMPT_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::MockImageBackend;
    use tokio::time::Instant;

    fn client_over(mock: Arc<MockImageBackend>) -> ImageClient {
        ImageClient::new(mock, Client::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_twice_then_success() {
        let mock = Arc::new(MockImageBackend::new(vec![
            Err(ImageError::RateLimited("slow down".into())),
            Err(ImageError::RateLimited("slow down".into())),
            Ok("https://img.example/desk.png".into()),
        ]));
        let start = Instant::now();
        let image = client_over(mock.clone()).generate("a desk").await.unwrap();
        assert_eq!(image.url, "https://img.example/desk.png");
        assert_eq!(image.attempts, 3);
        assert_eq!(mock.calls(), 3);
        // Two rate-limit waits: 4s then 8s.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(12) && elapsed < Duration::from_secs(13));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_error_fails_without_retry() {
        let mock = Arc::new(MockImageBackend::new(vec![
            Err(ImageError::InvalidCredentials("bad key".into())),
            Ok("never".into()),
        ]));
        let start = Instant::now();
        let failure = client_over(mock.clone()).generate("a desk").await.unwrap_err();
        assert_eq!(failure.attempts, 1);
        assert!(matches!(failure.error, ImageError::InvalidCredentials(_)));
        assert_eq!(mock.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_content_policy_fails_without_retry() {
        let mock = Arc::new(MockImageBackend::new(vec![Err(ImageError::ContentPolicy(
            "safety system".into(),
        ))]));
        let failure = client_over(mock.clone()).generate("x").await.unwrap_err();
        assert!(matches!(failure.error, ImageError::ContentPolicy(_)));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_exhausts_budget() {
        let mock = Arc::new(MockImageBackend::new(vec![Err(ImageError::Transient(
            "HTTP 500".into(),
        ))]));
        let start = Instant::now();
        let failure = client_over(mock.clone()).generate("x").await.unwrap_err();
        assert_eq!(failure.attempts, 3);
        assert_eq!(mock.calls(), 3);
        assert!(failure.to_string().contains("3 attempt"));
        // Generic waits: 1s then 2s.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_missing_credentials_short_circuits() {
        let mock = Arc::new(MockImageBackend::without_credentials());
        let failure = client_over(mock.clone()).generate("x").await.unwrap_err();
        assert_eq!(failure.error, ImageError::MissingCredentials);
        assert_eq!(failure.attempts, 0);
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_prompt_is_suffixed() {
        let mock = Arc::new(MockImageBackend::always("u"));
        client_over(mock.clone()).generate("a plant").await.unwrap();
        assert_eq!(mock.prompts(), vec![format!("a plant{}", SAFE_PROMPT_SUFFIX)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_many_reports_progress_and_keeps_order() {
        let mock = Arc::new(MockImageBackend::new(vec![
            Ok("one".into()),
            Err(ImageError::ContentPolicy("safety".into())),
            Ok("three".into()),
        ]));
        let prompts: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        let mut progress = Vec::new();
        let start = Instant::now();
        let results = client_over(mock)
            .generate_many(&prompts, |i, n| progress.push((i, n)))
            .await;
        assert_eq!(results, vec![Some("one".into()), None, Some("three".into())]);
        assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
        // Pauses between items only.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3));
    }
}
