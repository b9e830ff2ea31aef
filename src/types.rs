//! Artifact records passed between stages.
//!
//! Field names serialize in camelCase, matching the JSON the model is asked
//! to produce and the payloads sent to progress consumers.

use serde::{Deserialize, Serialize};

/// Article length as the pipeline measures it: Unicode scalar values.
pub fn content_length(text: &str) -> usize {
    text.chars().count()
}

/// Content plan produced by the strategist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub search_intent: String,
    pub target_audience: String,
    pub outline: Outline,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub meta_description: String,
}

/// Introduction points, body sections and conclusion points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    #[serde(default)]
    pub introduction: Vec<String>,
    #[serde(default)]
    pub body: Vec<Section>,
    #[serde(default)]
    pub conclusion: Vec<String>,
}

/// One body section of the outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    #[serde(default)]
    pub points: Vec<String>,
}

/// Raw article body from the writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub content: String,
    /// Character count of `content`.
    pub word_count: usize,
    /// Generation attempts used (1 or 2).
    pub attempts: u32,
}

impl Draft {
    pub fn new(content: impl Into<String>, attempts: u32) -> Self {
        let content = content.into();
        Self {
            word_count: content_length(&content),
            content,
            attempts,
        }
    }
}

/// One planned illustration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePlacement {
    /// Heading the image goes under.
    pub after_heading: String,
    pub description: String,
    /// Prompt sent to the image provider.
    pub dalle_prompt: String,
    pub alt_text: String,
}

/// The illustrator's planning response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IllustrationPlan {
    #[serde(default)]
    pub style: String,
    pub placements: Vec<ImagePlacement>,
}

/// Draft with generated images spliced in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IllustratedDraft {
    pub content: String,
    /// Placements whose image was generated; a subset of the plan.
    pub placements: Vec<ImagePlacement>,
    pub images_generated: usize,
    pub image_urls: Vec<String>,
}

/// Polished article from the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditedContent {
    pub content: String,
    /// Always empty; change tracking is not implemented.
    pub changes: Vec<String>,
}

/// The reviewer's four policy self-checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceChecklist {
    pub original_content: bool,
    pub has_value: bool,
    pub proper_length: bool,
    pub no_spam: bool,
}

/// Final gate decision and publishable markdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewVerdict {
    pub approved: bool,
    pub markdown: String,
    pub adsense_compliance: ComplianceChecklist,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}
