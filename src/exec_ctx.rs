//! Execution context shared across stage invocations.
//!
//! [`ExecCtx`] carries the HTTP client, text and image backends, transport
//! backoff, and cancellation handle. It is constructed once at process start
//! and passed to the pipeline; there are no global provider clients.

use crate::backend::{AnthropicBackend, BackoffConfig, TextBackend};
#[cfg(feature = "openai")]
use crate::backend::OpenAiBackend;
use crate::image::{ImageBackend, OpenAiImageBackend};
use reqwest::Client;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tracing::warn;

/// Shared execution context for stage invocations.
///
/// # Example
///
/// ```
/// use article_pipeline::backend::MockBackend;
/// use article_pipeline::image::MockImageBackend;
/// use article_pipeline::ExecCtx;
/// use std::sync::Arc;
///
/// let ctx = ExecCtx::builder()
///     .backend(Arc::new(MockBackend::fixed("{}")))
///     .images(Arc::new(MockImageBackend::always("https://img.example/1.png")))
///     .build();
/// assert!(!ctx.is_cancelled());
/// ```
pub struct ExecCtx {
    /// HTTP client (cheap to clone -- uses `Arc` internally).
    pub client: Client,
    /// Text-generation backend. Default: [`AnthropicBackend::from_env`].
    pub backend: Arc<dyn TextBackend>,
    /// Image-generation backend. Default: [`OpenAiImageBackend::from_env`].
    pub images: Arc<dyn ImageBackend>,
    /// Text transport retry configuration. Default: [`BackoffConfig::none()`].
    pub backoff: BackoffConfig,
    /// Optional cancellation flag; checked before every stage and call.
    pub cancellation: Option<Arc<AtomicBool>>,
}

impl ExecCtx {
    /// Create a new builder.
    pub fn builder() -> ExecCtxBuilder {
        ExecCtxBuilder {
            client: None,
            backend: None,
            images: None,
            backoff: None,
            cancellation: None,
            timeout: None,
        }
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|c| c.load(Ordering::Relaxed))
    }

    /// Return an error if cancellation has been requested.
    pub fn check_cancelled(&self) -> crate::error::Result<()> {
        if self.is_cancelled() {
            return Err(crate::PipelineError::Cancelled);
        }
        Ok(())
    }
}

impl std::fmt::Debug for ExecCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecCtx")
            .field("backend", &self.backend.name())
            .field("images", &self.images.name())
            .field("backoff", &self.backoff)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish()
    }
}

/// Builder for [`ExecCtx`].
pub struct ExecCtxBuilder {
    client: Option<Client>,
    backend: Option<Arc<dyn TextBackend>>,
    images: Option<Arc<dyn ImageBackend>>,
    backoff: Option<BackoffConfig>,
    cancellation: Option<Arc<AtomicBool>>,
    timeout: Option<Duration>,
}

impl ExecCtxBuilder {
    /// Set the HTTP client. If not set, a default client is created.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the text backend. Default: [`AnthropicBackend`] from `ANTHROPIC_API_KEY`.
    pub fn backend(mut self, backend: Arc<dyn TextBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use the Anthropic Messages API with the given key.
    pub fn anthropic(mut self, api_key: impl Into<String>) -> Self {
        self.backend = Some(Arc::new(AnthropicBackend::new(api_key)));
        self
    }

    /// Use an OpenAI-compatible chat completion server as the text backend.
    #[cfg(feature = "openai")]
    pub fn openai_with_key(
        mut self,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        self.backend = Some(Arc::new(OpenAiBackend::new(base_url).with_api_key(api_key)));
        self
    }

    /// Set the image backend. Default: [`OpenAiImageBackend`] from `OPENAI_API_KEY`.
    pub fn images(mut self, images: Arc<dyn ImageBackend>) -> Self {
        self.images = Some(images);
        self
    }

    /// Set the text transport retry configuration. Default: [`BackoffConfig::none()`].
    pub fn backoff(mut self, config: BackoffConfig) -> Self {
        self.backoff = Some(config);
        self
    }

    /// Set the cancellation flag.
    pub fn cancellation(mut self, cancel: Option<Arc<AtomicBool>>) -> Self {
        self.cancellation = cancel;
        self
    }

    /// Set the per-call timeout. Default: 120 seconds.
    ///
    /// Ignored when a custom `Client` is provided via `.client()`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the execution context.
    ///
    /// Missing backends fall back to the environment. A missing key does not
    /// fail here: the text backend is rejected by the provider on first use,
    /// and the image backend reports missing credentials per image.
    pub fn build(self) -> ExecCtx {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(120));
        let client = self.client.unwrap_or_else(|| {
            Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|e| {
                    warn!(error = %e, "failed to build HTTP client, using defaults");
                    Client::new()
                })
        });
        let backend = self.backend.unwrap_or_else(|| {
            let anthropic = AnthropicBackend::from_env().unwrap_or_else(|e| {
                warn!(error = %e, "no text backend configured");
                AnthropicBackend::new("")
            });
            Arc::new(anthropic)
        });
        ExecCtx {
            client,
            backend,
            images: self
                .images
                .unwrap_or_else(|| Arc::new(OpenAiImageBackend::from_env())),
            backoff: self.backoff.unwrap_or_else(BackoffConfig::none),
            cancellation: self.cancellation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::image::MockImageBackend;

    #[test]
    fn test_builder_uses_injected_backends() {
        let ctx = ExecCtx::builder()
            .backend(Arc::new(MockBackend::fixed("ok")))
            .images(Arc::new(MockImageBackend::always("u")))
            .timeout(Duration::from_secs(5))
            .build();
        assert_eq!(ctx.backend.name(), "mock");
        assert_eq!(ctx.images.name(), "mock");
        assert_eq!(ctx.backoff.max_retries, 0);
    }

    #[test]
    fn test_cancellation_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let ctx = ExecCtx::builder()
            .backend(Arc::new(MockBackend::fixed("ok")))
            .cancellation(Some(flag.clone()))
            .build();
        assert!(ctx.check_cancelled().is_ok());
        flag.store(true, Ordering::Relaxed);
        assert!(matches!(
            ctx.check_cancelled(),
            Err(crate::PipelineError::Cancelled)
        ));
    }

    #[test]
    fn test_debug_names_backends() {
        let ctx = ExecCtx::builder()
            .anthropic("sk-ant-secret-key-value")
            .images(Arc::new(MockImageBackend::always("u")))
            .build();
        let debug = format!("{:?}", ctx);
        assert!(debug.contains("anthropic"));
        assert!(!debug.contains("secret-key-value"));
    }
}
