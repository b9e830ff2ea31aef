//! Text-generation backends and normalized request/response types.
//!
//! The [`TextBackend`] trait abstracts over LLM providers, translating between
//! normalized [`LlmRequest`]/[`LlmResponse`] types and provider-specific
//! HTTP APIs. Built-in implementations: [`AnthropicBackend`], [`OpenAiBackend`]
//! (feature `openai`), and [`MockBackend`] for tests.
//!
//! ## Architecture
//!
//! ```text
//! stage ──► LlmRequest ──► with_backoff() ──► TextBackend::complete() ──► LlmResponse
//!                                                   │                        │
//!                                  ┌────────────────┴──┐              ResponseContent
//!                          AnthropicBackend     OpenAiBackend          Text | Other
//!                            /v1/messages    /v1/chat/completions
//! ```

pub mod anthropic;
pub mod backoff;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;

pub use anthropic::AnthropicBackend;
pub use backoff::BackoffConfig;
pub use mock::{MockBackend, MockReply};
#[cfg(feature = "openai")]
pub use openai::OpenAiBackend;

use crate::config::LlmConfig;
use crate::error::Result;
use crate::exec_ctx::ExecCtx;
use crate::retry::{with_retry, RetryDecision, RetryPolicy};
use crate::PipelineError;
use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;

/// A normalized text-generation request: system instruction, one user
/// message, and an output-token budget.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Model identifier (e.g. `"claude-sonnet-4-20250514"`).
    pub model: String,

    /// Role-specific system instruction.
    pub system_prompt: String,

    /// The rendered user message.
    pub prompt: String,

    /// Sampling and length settings.
    pub config: LlmConfig,
}

impl LlmRequest {
    /// Build a request for `model` with the given instruction and message.
    pub fn new(
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
            prompt: prompt.into(),
            config: LlmConfig::default(),
        }
    }

    /// Replace the sampling and length settings.
    pub fn with_config(mut self, config: LlmConfig) -> Self {
        self.config = config;
        self
    }
}

/// The first content block of a provider response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseContent {
    /// Generated text.
    Text(String),
    /// Any non-text block (tool use, image, empty content, ...).
    Other {
        /// The block type the provider reported.
        kind: String,
    },
}

/// A normalized LLM response.
#[derive(Debug)]
pub struct LlmResponse {
    /// The first content block.
    pub content: ResponseContent,

    /// HTTP status code (for diagnostics/logging).
    pub status: u16,

    /// Provider-specific metadata (token usage, model, id).
    pub metadata: Option<serde_json::Value>,
}

impl LlmResponse {
    /// A successful text response.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: ResponseContent::Text(text.into()),
            status: 200,
            metadata: None,
        }
    }

    /// The generated text, or [`PipelineError::UnexpectedResponseShape`] for
    /// any non-text content.
    pub fn into_text(self) -> Result<String> {
        match self.content {
            ResponseContent::Text(text) => Ok(text),
            ResponseContent::Other { kind } => {
                Err(PipelineError::UnexpectedResponseShape { kind })
            }
        }
    }
}

/// Abstraction over text-generation providers.
///
/// Backends own their endpoint and credentials; the shared HTTP client (and
/// its connection pool and timeout) comes from the [`ExecCtx`].
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn TextBackend>`.
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Execute one non-streaming completion.
    async fn complete(&self, client: &Client, request: &LlmRequest) -> Result<LlmResponse>;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// Parse a `Retry-After` header value as whole seconds.
pub(crate) fn parse_retry_after(value: &str) -> Option<std::time::Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .map(std::time::Duration::from_secs)
}

/// Run a completion with the context's transport-level retry and return its text.
///
/// Transient failures (network, 429, 5xx) are retried on the context's
/// [`BackoffConfig`], honoring `Retry-After` when configured. The default
/// context has no transport retry, so failures surface straight to the stage.
/// Cancellation is checked before every attempt.
pub async fn with_backoff(ctx: &ExecCtx, request: &LlmRequest) -> Result<String> {
    let config = &ctx.backoff;
    let policy = RetryPolicy::new(config.max_retries + 1).with_backoff(config.clone());

    let outcome = with_retry(
        &policy,
        |_, _| async move {
            ctx.check_cancelled()?;
            ctx.backend.complete(&ctx.client, request).await
        },
        |result, attempt| match result {
            Err(e) if e.is_transient() => {
                warn!(
                    backend = ctx.backend.name(),
                    attempt,
                    error = %e,
                    "text generation failed"
                );
                match e {
                    PipelineError::HttpError {
                        retry_after: Some(delay),
                        ..
                    } if config.respect_retry_after => RetryDecision::RetryAfter(*delay),
                    _ => RetryDecision::Retry,
                }
            }
            _ => RetryDecision::Done,
        },
    )
    .await;

    outcome.result?.into_text()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn request() -> LlmRequest {
        LlmRequest::new("test-model", "system", "user")
    }

    #[test]
    fn test_into_text_accepts_text() {
        let resp = LlmResponse::text("hello");
        assert_eq!(resp.into_text().unwrap(), "hello");
    }

    #[test]
    fn test_into_text_rejects_other_shape() {
        let resp = LlmResponse {
            content: ResponseContent::Other {
                kind: "tool_use".into(),
            },
            status: 200,
            metadata: None,
        };
        match resp.into_text() {
            Err(PipelineError::UnexpectedResponseShape { kind }) => assert_eq!(kind, "tool_use"),
            other => panic!("expected UnexpectedResponseShape, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(
            parse_retry_after(" 30 "),
            Some(std::time::Duration::from_secs(30))
        );
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[tokio::test]
    async fn test_with_backoff_default_does_not_retry() {
        let mock = Arc::new(MockBackend::new(vec![
            MockReply::http_error(503, "overloaded"),
            MockReply::text("never reached"),
        ]));
        let ctx = ExecCtx::builder().backend(mock.clone()).build();
        let result = with_backoff(&ctx, &request()).await;
        assert!(matches!(result, Err(PipelineError::HttpError { status: 503, .. })));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_backoff_retries_transient() {
        let mock = Arc::new(MockBackend::new(vec![
            MockReply::http_error(503, "overloaded"),
            MockReply::text("recovered"),
        ]));
        let ctx = ExecCtx::builder()
            .backend(mock.clone())
            .backoff(BackoffConfig::standard())
            .build();
        let text = with_backoff(&ctx, &request()).await.unwrap();
        assert_eq!(text, "recovered");
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_backoff_does_not_retry_rejection() {
        let mock = Arc::new(MockBackend::new(vec![
            MockReply::http_error(401, "invalid x-api-key"),
            MockReply::text("never reached"),
        ]));
        let ctx = ExecCtx::builder()
            .backend(mock.clone())
            .backoff(BackoffConfig::standard())
            .build();
        let result = with_backoff(&ctx, &request()).await;
        assert!(matches!(result, Err(PipelineError::HttpError { status: 401, .. })));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_with_backoff_respects_cancellation() {
        use std::sync::atomic::AtomicBool;

        let mock = Arc::new(MockBackend::fixed("unused"));
        let ctx = ExecCtx::builder()
            .backend(mock.clone())
            .cancellation(Some(Arc::new(AtomicBool::new(true))))
            .build();
        let result = with_backoff(&ctx, &request()).await;
        assert!(matches!(result, Err(PipelineError::Cancelled)));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_with_backoff_surfaces_unexpected_shape() {
        let mock = Arc::new(MockBackend::new(vec![MockReply::non_text("tool_use")]));
        let ctx = ExecCtx::builder().backend(mock).build();
        let result = with_backoff(&ctx, &request()).await;
        assert!(matches!(
            result,
            Err(PipelineError::UnexpectedResponseShape { .. })
        ));
    }
}
