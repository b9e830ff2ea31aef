//! The five pipeline stages.
//!
//! Each stage is a request/response unit: it consumes upstream artifacts,
//! issues one text generation (the illustrator adds N image calls), and
//! returns a typed artifact. Any failure is reported as
//! [`PipelineError::StageFailed`] naming the stage.

pub mod editor;
pub mod illustrator;
pub mod prompts;
pub mod reviewer;
pub mod strategist;
pub mod writer;

use crate::backend::{with_backoff, LlmRequest};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::exec_ctx::ExecCtx;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Identifies a stage in events, errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageId {
    Strategist,
    Writer,
    Illustrator,
    Editor,
    Reviewer,
}

impl StageId {
    /// All stages in execution order.
    pub const ALL: [StageId; 5] = [
        StageId::Strategist,
        StageId::Writer,
        StageId::Illustrator,
        StageId::Editor,
        StageId::Reviewer,
    ];

    /// Stable lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Strategist => "strategist",
            StageId::Writer => "writer",
            StageId::Illustrator => "illustrator",
            StageId::Editor => "editor",
            StageId::Reviewer => "reviewer",
        }
    }

    /// Name shown to people.
    pub fn display_name(&self) -> &'static str {
        match self {
            StageId::Strategist => "Strategist",
            StageId::Writer => "Writer",
            StageId::Illustrator => "Illustrator",
            StageId::Editor => "Editor",
            StageId::Reviewer => "Reviewer",
        }
    }

    /// What the stage does, used for `running` messages.
    pub fn description(&self) -> &'static str {
        match self {
            StageId::Strategist => "Designing an SEO-focused content structure",
            StageId::Writer => "Writing a natural, human-sounding draft",
            StageId::Illustrator => "Planning and generating article images",
            StageId::Editor => "Polishing wording and readability",
            StageId::Reviewer => "Checking ad-policy compliance and finalizing markdown",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One text generation on behalf of `stage`.
pub(crate) async fn generate(
    ctx: &ExecCtx,
    config: &PipelineConfig,
    stage: StageId,
    system_prompt: &str,
    prompt: String,
    max_tokens: u32,
) -> Result<String> {
    let request = LlmRequest::new(&config.text_model, system_prompt, prompt)
        .with_config(config.llm_config(max_tokens));
    debug!(
        stage = stage.as_str(),
        backend = ctx.backend.name(),
        max_tokens,
        prompt_len = request.prompt.len(),
        "text generation"
    );
    with_backoff(ctx, &request).await
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Canned model responses shared by stage and pipeline tests.

    use crate::types::{Outline, Section, Strategy};
    use serde_json::json;

    pub fn strategy() -> Strategy {
        Strategy {
            search_intent: "Learn how to set up a productive home office".into(),
            target_audience: "Remote workers".into(),
            outline: Outline {
                introduction: vec!["Why your workspace matters".into()],
                body: vec![
                    Section {
                        heading: "Choosing the Right Desk".into(),
                        points: vec!["Height".into(), "Depth".into()],
                    },
                    Section {
                        heading: "Lighting and Ergonomics".into(),
                        points: vec!["Natural light".into()],
                    },
                    Section {
                        heading: "Cable Management".into(),
                        points: vec!["Trays".into()],
                    },
                ],
                conclusion: vec!["Start small".into()],
            },
            keywords: vec!["home office".into(), "productivity".into()],
            meta_description: "Build a home office that keeps you productive.".into(),
        }
    }

    pub fn strategy_json() -> String {
        format!(
            "Here is the plan:\n```json\n{}\n```",
            serde_json::to_string_pretty(&strategy()).unwrap_or_default()
        )
    }

    /// A markdown article of exactly `len` characters with the outline's headings.
    pub fn article(len: usize) -> String {
        let head = "# Home Office Setup\n\n## Choosing the Right Desk\nA desk sets the tone.\n\n## Lighting and Ergonomics\nLight matters.\n\n## Cable Management\nKeep it tidy.\n";
        let head_len = head.chars().count();
        assert!(len >= head_len, "article too short for headings");
        format!("{}{}", head, "x".repeat(len - head_len))
    }

    pub fn plan_json(headings: &[&str]) -> String {
        let placements: Vec<_> = headings
            .iter()
            .enumerate()
            .map(|(i, h)| {
                json!({
                    "afterHeading": h,
                    "description": format!("image {}", i + 1),
                    "dallePrompt": format!("prompt {}", i + 1),
                    "altText": format!("alt {}", i + 1),
                })
            })
            .collect();
        json!({"style": "warm photography", "placements": placements}).to_string()
    }

    pub fn verdict_json(approved: bool, proper_length: bool, markdown: &str) -> String {
        json!({
            "approved": approved,
            "markdown": markdown,
            "adsenseCompliance": {
                "originalContent": true,
                "hasValue": true,
                "properLength": proper_length,
                "noSpam": true,
            },
            "suggestions": ["Add a personal anecdote"],
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_ids_round_trip_names() {
        for stage in StageId::ALL {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage.as_str()));
            assert!(!stage.description().is_empty());
        }
        assert_eq!(StageId::Reviewer.display_name(), "Reviewer");
    }
}
