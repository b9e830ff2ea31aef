//! Default system instructions and user-message builders for each stage.

use crate::prompt::{bullet_list, render, section};
use crate::types::{content_length, Strategy};

pub const STRATEGIST_SYSTEM: &str = "You are an SEO content strategist. Given a topic, design the structure of a blog post that answers real search intent. Respond with JSON only, in this shape:
{\"searchIntent\": string, \"targetAudience\": string, \"outline\": {\"introduction\": [string], \"body\": [{\"heading\": string, \"points\": [string]}], \"conclusion\": [string]}, \"keywords\": [string], \"metaDescription\": string}";

pub const WRITER_SYSTEM: &str = "You are an experienced blog writer. Write in a warm, conversational voice with varied sentence length and occasional personal opinion. Use markdown with one `#` title and a `##` heading for every body section of the outline. Output only the article markdown.";

pub const ILLUSTRATOR_SYSTEM: &str = "You are a blog art director. Choose 2 to 4 places in the article where an image helps the reader, and write an image-generation prompt for each. Respond with JSON only, in this shape:
{\"style\": string, \"placements\": [{\"afterHeading\": string, \"description\": string, \"dallePrompt\": string, \"altText\": string}]}
`afterHeading` must repeat an existing `##` heading of the article verbatim.";

pub const EDITOR_SYSTEM: &str = "You are a meticulous copy editor. Replace repeated words with synonyms, cut needless modifiers, and improve readability while keeping the author's voice. Keep all markdown, including image references. Output only the edited markdown.";

pub const REVIEWER_SYSTEM: &str = "You are a content reviewer for ad-supported publishing. Check that the article is original, gives the reader real value, has a proper length, and is free of spam. Respond with JSON only, in this shape:
{\"approved\": boolean, \"markdown\": string, \"adsenseCompliance\": {\"originalContent\": boolean, \"hasValue\": boolean, \"properLength\": boolean, \"noSpam\": boolean}, \"suggestions\": [string]}";

const STRATEGIST_TEMPLATE: &str = "Topic: {topic}
{keywords}
Design an SEO-optimized blog post structure for this topic.";

const WRITER_TEMPLATE: &str = "{strategy}

{structure}

Write a natural, human blog post from this structure. It must be at least {min} characters long.";

const WRITER_RETRY_TEMPLATE: &str = "{base}

Your previous draft was only {previous} characters long. The article must be at least {min} characters. Expand every section with concrete examples and detail until it meets the minimum.";

const ILLUSTRATOR_TEMPLATE: &str = "{topic}

{audience}

{draft}

---

Pick 2 to 4 spots in this post where an image fits, and write an image-generation prompt for each.";

const EDITOR_TEMPLATE: &str = "Edit the following article. Replace repeated words with synonyms, remove unnecessary modifiers, and improve readability. Keep the original voice and tone.

---

{content}

---

Output only the edited markdown.";

const REVIEWER_TEMPLATE: &str = "{strategy}

{content}

---

{length}

Review this article against ad-network content policy and produce the final markdown as JSON.";

/// User message for the strategist.
pub fn strategist(topic: &str, keywords: &[String]) -> String {
    let keywords = if keywords.is_empty() {
        String::new()
    } else {
        format!("Additional keywords: {}", keywords.join(", "))
    };
    render(STRATEGIST_TEMPLATE, &[("topic", topic), ("keywords", keywords.as_str())])
}

/// User message for the writer's first attempt.
pub fn writer(strategy: &Strategy, min_length: usize) -> String {
    let summary = section(
        "Content strategy",
        &bullet_list(&[
            format!("Search intent: {}", strategy.search_intent),
            format!("Target audience: {}", strategy.target_audience),
            format!("Keywords: {}", strategy.keywords.join(", ")),
        ]),
    );

    let outline = &strategy.outline;
    let mut structure = String::from("## Structure\n### Introduction\n");
    structure.push_str(&bullet_list(&outline.introduction));
    structure.push_str("\n\n### Body\n");
    for body in &outline.body {
        structure.push_str(&format!("#### {}\n{}\n\n", body.heading, bullet_list(&body.points)));
    }
    structure.push_str("### Conclusion\n");
    structure.push_str(&bullet_list(&outline.conclusion));

    let min = min_length.to_string();
    render(
        WRITER_TEMPLATE,
        &[
            ("strategy", summary.as_str()),
            ("structure", structure.as_str()),
            ("min", min.as_str()),
        ],
    )
}

/// User message for the writer's length-enforcing second attempt.
pub fn writer_retry(base: &str, previous_len: usize, min_length: usize) -> String {
    let previous = previous_len.to_string();
    let min = min_length.to_string();
    render(
        WRITER_RETRY_TEMPLATE,
        &[
            ("base", base),
            ("previous", previous.as_str()),
            ("min", min.as_str()),
        ],
    )
}

/// User message for the illustrator's planning call.
pub fn illustrator(draft: &str, strategy: &Strategy) -> String {
    render(
        ILLUSTRATOR_TEMPLATE,
        &[
            ("topic", section("Blog topic", &strategy.search_intent).as_str()),
            ("audience", section("Target audience", &strategy.target_audience).as_str()),
            ("draft", section("Article", draft).as_str()),
        ],
    )
}

/// User message for the editor.
pub fn editor(content: &str) -> String {
    render(EDITOR_TEMPLATE, &[("content", content)])
}

/// User message for the reviewer, with a length-compliance hint.
pub fn reviewer(content: &str, strategy: &Strategy, min_length: usize) -> String {
    let summary = section(
        "Original strategy",
        &bullet_list(&[
            format!("Search intent: {}", strategy.search_intent),
            format!("Target audience: {}", strategy.target_audience),
            format!("Meta description: {}", strategy.meta_description),
        ]),
    );
    render(
        REVIEWER_TEMPLATE,
        &[
            ("strategy", summary.as_str()),
            ("content", section("Content to review", content).as_str()),
            ("length", length_hint(content_length(content), min_length).as_str()),
        ],
    )
}

fn length_hint(current: usize, min_length: usize) -> String {
    if current >= min_length {
        format!(
            "Length check: the article is {} characters; the minimum is {}. It meets the length requirement, so properLength should be true.",
            current, min_length
        )
    } else {
        format!(
            "Length check: the article is {} characters; the minimum is {}. It is {} characters short, so properLength must be false and approved must be false.",
            current,
            min_length,
            min_length - current
        )
    }
}
