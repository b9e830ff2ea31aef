//! Reviewer: final policy check and publishable markdown.
//!
//! The model is told the article's length, but its self-assessment is not
//! trusted: [`enforce_length_policy`] overrides the verdict whenever the
//! final markdown is below the minimum.

use super::{generate, prompts, StageId};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::exec_ctx::ExecCtx;
use crate::output_parser::parse_structured;
use crate::types::{content_length, ReviewVerdict, Strategy};
use crate::PipelineError;
use tracing::{info, warn};

/// Review `content` against `strategy`. Returns the model's own verdict.
pub async fn run(
    ctx: &ExecCtx,
    config: &PipelineConfig,
    content: &str,
    strategy: &Strategy,
) -> Result<ReviewVerdict> {
    review(ctx, config, content, strategy)
        .await
        .map_err(|e| PipelineError::stage(StageId::Reviewer, e))
}

async fn review(
    ctx: &ExecCtx,
    config: &PipelineConfig,
    content: &str,
    strategy: &Strategy,
) -> Result<ReviewVerdict> {
    let text = generate(
        ctx,
        config,
        StageId::Reviewer,
        &config.prompts.reviewer,
        prompts::reviewer(content, strategy, config.min_content_length),
        config.budgets.reviewer,
    )
    .await?;
    let verdict: ReviewVerdict = parse_structured(&text)?;
    info!(approved = verdict.approved, "review complete");
    Ok(verdict)
}

/// Force disapproval when the final markdown is shorter than `min_length`.
///
/// Clears `approved` and `properLength` and puts a shortfall note first in
/// `suggestions`. Verdicts that meet the minimum are returned untouched.
pub fn enforce_length_policy(mut verdict: ReviewVerdict, min_length: usize) -> ReviewVerdict {
    let length = content_length(&verdict.markdown);
    if length >= min_length {
        return verdict;
    }
    warn!(
        length,
        min_length,
        model_approved = verdict.approved,
        "final markdown below minimum length; approval withheld"
    );
    verdict.approved = false;
    verdict.adsense_compliance.proper_length = false;
    verdict.suggestions.insert(
        0,
        format!(
            "Content is too short: {} characters against a minimum of {} ({} short). Expand the article before publishing.",
            length,
            min_length,
            min_length - length
        ),
    );
    verdict
}
