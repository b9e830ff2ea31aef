//! Mock text backend for testing without a live LLM.
//!
//! [`MockBackend`] returns scripted replies in call order and records every
//! request it receives, so tests can assert on both sides of the boundary.
//!
//! # Example
//!
//! ```
//! use article_pipeline::backend::{MockBackend, MockReply};
//!
//! let mock = MockBackend::new(vec![
//!     MockReply::text("{\"searchIntent\": \"...\"}"),
//!     MockReply::http_error(503, "overloaded"),
//! ]);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;

use super::{LlmRequest, LlmResponse, ResponseContent, TextBackend};
use crate::error::Result;
use crate::PipelineError;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// A successful text response.
    Text(String),
    /// A successful response whose first block is not text.
    NonText(String),
    /// A provider HTTP error.
    HttpError {
        /// Status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// A failure that never reached the provider.
    Fail(String),
}

impl MockReply {
    /// A successful text response.
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }

    /// A non-text response of the given block type.
    pub fn non_text(kind: impl Into<String>) -> Self {
        MockReply::NonText(kind.into())
    }

    /// A provider HTTP error.
    pub fn http_error(status: u16, body: impl Into<String>) -> Self {
        MockReply::HttpError {
            status,
            body: body.into(),
        }
    }

    /// A local failure.
    pub fn fail(message: impl Into<String>) -> Self {
        MockReply::Fail(message.into())
    }
}

/// A test backend that returns scripted replies in order.
///
/// Cycles back to the beginning when all replies have been consumed.
#[derive(Debug)]
pub struct MockBackend {
    replies: Vec<MockReply>,
    index: AtomicUsize,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockBackend {
    /// Create a mock backend with the given scripted replies.
    pub fn new(replies: Vec<MockReply>) -> Self {
        assert!(!replies.is_empty(), "MockBackend requires at least one reply");
        Self {
            replies,
            index: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always returns the same text.
    pub fn fixed(response: impl Into<String>) -> Self {
        Self::new(vec![MockReply::text(response)])
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn next_reply(&self) -> MockReply {
        let idx = self.index.fetch_add(1, Ordering::SeqCst) % self.replies.len();
        self.replies[idx].clone()
    }
}

#[async_trait]
impl TextBackend for MockBackend {
    async fn complete(&self, _client: &Client, request: &LlmRequest) -> Result<LlmResponse> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }
        match self.next_reply() {
            MockReply::Text(text) => Ok(LlmResponse::text(text)),
            MockReply::NonText(kind) => Ok(LlmResponse {
                content: ResponseContent::Other { kind },
                status: 200,
                metadata: None,
            }),
            MockReply::HttpError { status, body } => Err(PipelineError::HttpError {
                status,
                body,
                retry_after: None,
            }),
            MockReply::Fail(message) => Err(PipelineError::Other(message)),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
