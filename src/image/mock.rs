//! Mock image backend for testing without a live provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;

use super::{ImageBackend, ImageError};

/// A test image backend that returns scripted outcomes in order.
///
/// Cycles back to the beginning when all outcomes have been consumed.
///
/// # Example
///
/// ```
/// use article_pipeline::image::{ImageError, MockImageBackend};
///
/// let mock = MockImageBackend::new(vec![
///     Err(ImageError::RateLimited("slow down".into())),
///     Ok("https://img.example/1.png".into()),
/// ]);
/// ```
#[derive(Debug)]
pub struct MockImageBackend {
    outcomes: Vec<Result<String, ImageError>>,
    index: AtomicUsize,
    credentials: bool,
    prompts: Mutex<Vec<String>>,
}

impl MockImageBackend {
    /// Create a mock with the given scripted outcomes.
    pub fn new(outcomes: Vec<Result<String, ImageError>>) -> Self {
        assert!(
            !outcomes.is_empty(),
            "MockImageBackend requires at least one outcome"
        );
        Self {
            outcomes,
            index: AtomicUsize::new(0),
            credentials: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A mock that always succeeds with `url`.
    pub fn always(url: impl Into<String>) -> Self {
        Self::new(vec![Ok(url.into())])
    }

    /// A mock that reports no configured credentials.
    pub fn without_credentials() -> Self {
        Self {
            credentials: false,
            ..Self::always("unused")
        }
    }

    /// Number of generation calls made so far.
    pub fn calls(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    /// Every prompt received, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ImageBackend for MockImageBackend {
    async fn generate(&self, _client: &Client, prompt: &str) -> Result<String, ImageError> {
        if let Ok(mut log) = self.prompts.lock() {
            log.push(prompt.to_string());
        }
        let idx = self.index.fetch_add(1, Ordering::SeqCst) % self.outcomes.len();
        self.outcomes[idx].clone()
    }

    fn has_credentials(&self) -> bool {
        self.credentials
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
