//! Typed extraction of the structured payload embedded in a model response.

use serde::de::DeserializeOwned;

use crate::error::truncate;
use crate::output_parser::error::ParseError;
use crate::output_parser::extract::locate;

/// Parse the structured payload in `response` into `T`.
///
/// Strategies (in order):
/// 1. Interior of the first fenced block (`` ```json `` or bare `` ``` ``)
/// 2. First `{` through last `}`
///
/// A located candidate that fails to deserialize is an error; the parser
/// does not fall through to the next strategy or substitute a default.
///
/// # Examples
///
/// ```
/// use serde::Deserialize;
/// use article_pipeline::output_parser::parse_structured;
///
/// #[derive(Deserialize, Debug, PartialEq)]
/// struct Verdict {
///     approved: bool,
/// }
///
/// let response = "Review done.\n```json\n{\"approved\": true}\n```";
/// let verdict: Verdict = parse_structured(response).unwrap();
/// assert!(verdict.approved);
/// ```
pub fn parse_structured<T: DeserializeOwned>(response: &str) -> Result<T, ParseError> {
    let candidate = locate(response).ok_or(ParseError::NoPayload)?;
    let text = candidate.text();
    serde_json::from_str::<T>(text).map_err(|e| ParseError::Malformed {
        reason: e.to_string(),
        raw: truncate(text, 200),
    })
}
