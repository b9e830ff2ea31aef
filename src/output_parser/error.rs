//! Error types for structured-response extraction.

/// Errors returned when a structured payload cannot be recovered from model text.
///
/// Always fatal to the stage that issued the call.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Neither a fenced block nor a brace-delimited region was present.
    #[error("no structured payload found in model response")]
    NoPayload,

    /// A candidate was located but did not deserialize into the expected shape.
    #[error("structured payload is malformed: {reason}")]
    Malformed {
        /// The serde error message.
        reason: String,
        /// A truncated copy of the candidate text (max 200 chars).
        raw: String,
    },
}
