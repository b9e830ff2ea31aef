//! Prompt building helpers.

/// Sentinel that should never appear in real templates.
const ESCAPE_SENTINEL: &str = "\x00LBRACE\x00";
/// Sentinel for escaped closing brace.
const ESCAPE_SENTINEL_CLOSE: &str = "\x00RBRACE\x00";

/// Build a prompt string with variable substitution.
///
/// Replaces `{key}` placeholders in the template with the paired values.
/// Use `{{` to insert a literal `{` and `}}` to insert a literal `}`.
/// Substituted values are inserted verbatim and never re-scanned.
///
/// # Example
///
/// ```
/// use article_pipeline::prompt::render;
///
/// let result = render("Topic: {topic}, as JSON: {{\"k\": 1}}", &[("topic", "tea")]);
/// assert_eq!(result, r#"Topic: tea, as JSON: {"k": 1}"#);
/// ```
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    // Pass 1: protect escaped braces
    let mut rendered = template.replace("{{", ESCAPE_SENTINEL);
    rendered = rendered.replace("}}", ESCAPE_SENTINEL_CLOSE);

    // Pass 2: substitute placeholders, left to right, without re-scanning values
    let mut out = String::with_capacity(rendered.len());
    let mut rest = rendered.as_str();
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);

    // Pass 3: restore escaped braces
    out.replace(ESCAPE_SENTINEL, "{")
        .replace(ESCAPE_SENTINEL_CLOSE, "}")
}

/// Create a markdown bullet list, one `- item` per line.
pub fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wrap text in a labeled section for structured prompts.
pub fn section(label: &str, content: &str) -> String {
    format!("## {}\n{}", label, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic() {
        let result = render("Write about {topic} for {audience}", &[
            ("topic", "tea"),
            ("audience", "students"),
        ]);
        assert_eq!(result, "Write about tea for students");
    }

    #[test]
    fn test_render_unknown_placeholder_kept() {
        let result = render("static {unknown} prompt", &[]);
        assert_eq!(result, "static {unknown} prompt");
    }

    #[test]
    fn test_render_value_not_rescanned() {
        let result = render("{a} and {b}", &[("a", "{b}"), ("b", "x")]);
        assert_eq!(result, "{b} and x");
    }

    #[test]
    fn test_render_escaped_braces() {
        let result = render("Reply as {{\"approved\": {{\"x\": 1}}}} about {topic}", &[(
            "topic", "desks",
        )]);
        assert_eq!(result, r#"Reply as {"approved": {"x": 1}} about desks"#);
    }

    #[test]
    fn test_bullet_list() {
        let items = vec!["First".to_string(), "Second".to_string()];
        assert_eq!(bullet_list(&items), "- First\n- Second");
        assert_eq!(bullet_list(&[]), "");
    }

    #[test]
    fn test_section() {
        let result = section("Context", "Some knowledge here");
        assert_eq!(result, "## Context\nSome knowledge here");
    }
}
