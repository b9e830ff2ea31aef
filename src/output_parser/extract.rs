//! Candidate location for structured payloads in free-form model output.
//!
//! Two strategies, tried in order: a triple-backtick fenced block (optionally
//! language-tagged), then the span from the first `{` to the last `}`.

/// Where a candidate payload was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate<'a> {
    /// Interior of the first fenced block, language tag removed.
    Fenced(&'a str),
    /// First opening brace through last closing brace, inclusive.
    Braced(&'a str),
}

impl<'a> Candidate<'a> {
    /// The candidate text.
    pub fn text(&self) -> &'a str {
        match self {
            Candidate::Fenced(s) | Candidate::Braced(s) => s,
        }
    }
}

/// Locate the structured payload candidate in `text`.
///
/// A fenced block wins whenever one is present, even if a brace span also
/// exists elsewhere in the text. Returns `None` when neither is found.
///
/// # Examples
///
/// ```
/// use article_pipeline::output_parser::extract::{locate, Candidate};
///
/// let input = "Here:\n```json\n{\"a\": 1}\n```";
/// assert_eq!(locate(input), Some(Candidate::Fenced("{\"a\": 1}")));
///
/// let input = "Sure! {\"a\": 1} Hope that helps.";
/// assert_eq!(locate(input), Some(Candidate::Braced("{\"a\": 1}")));
/// ```
pub fn locate(text: &str) -> Option<Candidate<'_>> {
    if let Some(inner) = extract_fenced_block(text) {
        return Some(Candidate::Fenced(inner));
    }
    brace_span(text).map(Candidate::Braced)
}

/// Extract the interior of the first complete fenced block.
///
/// The fence may be followed by a language tag (`json`, `JSON`, ...), either
/// on its own line or directly before the payload. The tag is dropped and the
/// remainder trimmed.
pub fn extract_fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let body_start = open + 3;
    let close = text[body_start..].find("```")?;
    let inner = &text[body_start..body_start + close];
    Some(strip_language_tag(inner).trim())
}

/// Drop a leading language tag such as `json` from a fenced block's interior.
fn strip_language_tag(inner: &str) -> &str {
    let trimmed = inner.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed;
    }
    let tag_len = trimmed
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(trimmed.len());
    if tag_len == 0 {
        return trimmed;
    }
    &trimmed[tag_len..]
}

/// The substring from the first `{` to the last `}`, inclusive.
///
/// # Examples
///
/// ```
/// use article_pipeline::output_parser::extract::brace_span;
///
/// assert_eq!(brace_span("x {\"a\": {\"b\": 1}} y"), Some("{\"a\": {\"b\": 1}}"));
/// assert_eq!(brace_span("no braces"), None);
/// ```
pub fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_with_language_tag() {
        let input = "Here:\n```json\n{\"a\": 1}\n```\nDone.";
        assert_eq!(extract_fenced_block(input), Some("{\"a\": 1}"));
    }

    #[test]
    fn fenced_without_language_tag() {
        let input = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_fenced_block(input), Some("{\"a\": 1}"));
    }

    #[test]
    fn fenced_on_single_line() {
        let input = "```json{\"a\": 1}```";
        assert_eq!(extract_fenced_block(input), Some("{\"a\": 1}"));
    }

    #[test]
    fn fenced_unclosed_is_ignored() {
        let input = "```json\n{\"a\": 1}";
        assert_eq!(extract_fenced_block(input), None);
        assert_eq!(locate(input), Some(Candidate::Braced("{\"a\": 1}")));
    }

    #[test]
    fn fenced_wins_over_braces() {
        let input = "{\"early\": true}\n```json\n{\"a\": 1}\n```";
        assert_eq!(locate(input), Some(Candidate::Fenced("{\"a\": 1}")));
    }

    #[test]
    fn brace_span_first_to_last() {
        let input = "note {\"a\": 1} and {\"b\": 2} end";
        assert_eq!(brace_span(input), Some("{\"a\": 1} and {\"b\": 2}"));
    }

    #[test]
    fn brace_span_reversed_is_none() {
        assert_eq!(brace_span("} then {"), None);
    }

    #[test]
    fn nothing_found() {
        assert_eq!(locate("plain prose, nothing structured"), None);
    }
}
