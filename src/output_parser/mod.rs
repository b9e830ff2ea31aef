//! # Structured-response extraction
//!
//! Every text-generating stage asks the model for a JSON object and gets back
//! prose, a fenced block, or both. This module recovers the object
//! deterministically and reports a [`ParseError`] when it cannot.
//!
//! | Function | Purpose |
//! |----------|---------|
//! | [`parse_structured`] | Locate and deserialize a typed payload |
//! | [`extract::locate`] | Find the candidate text without parsing it |

pub mod error;
pub mod extract;
pub mod json;

pub use error::ParseError;
pub use json::parse_structured;
