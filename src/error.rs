use crate::output_parser::ParseError;
use crate::stages::StageId;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by the pipeline, its stages, and the provider backends.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Low-level HTTP transport failure (connection refused, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing failed at the serde level.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// A model response carried no usable structured payload.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A stage failed; the run is aborted.
    #[error("{} failed: {source}", .stage.display_name())]
    StageFailed {
        /// The stage that failed.
        stage: StageId,
        /// The underlying cause.
        #[source]
        source: Box<PipelineError>,
    },

    /// The provider answered with something other than text.
    #[error("unexpected response shape: expected text, got {kind}")]
    UnexpectedResponseShape {
        /// The content block type the provider reported.
        kind: String,
    },

    /// HTTP error with status code, response body, and optional Retry-After hint.
    #[error("HTTP {status}: {body}")]
    HttpError {
        /// HTTP status code (e.g. 401, 429, 500).
        status: u16,
        /// Response body text.
        body: String,
        /// Parsed `Retry-After` header value, if present.
        retry_after: Option<Duration>,
    },

    /// Caller-supplied input was rejected before any stage ran.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration detected at build time.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The run was cancelled via the cancellation flag.
    #[error("Pipeline was cancelled")]
    Cancelled,

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

impl PipelineError {
    /// Wrap `source` as the terminal failure of `stage`.
    ///
    /// An error that is already a stage failure, or a cancellation, is
    /// returned unchanged.
    pub fn stage(stage: StageId, source: PipelineError) -> Self {
        match source {
            already @ (PipelineError::StageFailed { .. } | PipelineError::Cancelled) => already,
            other => PipelineError::StageFailed {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error is attributed to, if any.
    pub fn failed_stage(&self) -> Option<StageId> {
        match self {
            PipelineError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Network failures, timeouts, rate limits and 5xx responses.
    ///
    /// Everything else (auth, policy, malformed output) is a rejection and is
    /// never retried.
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::Request(_) => true,
            PipelineError::HttpError { status, .. } => *status == 429 || *status >= 500,
            PipelineError::StageFailed { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
