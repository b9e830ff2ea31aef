//! Writer: strategy in, draft out, with a soft minimum-length policy.
//!
//! A draft shorter than `min_content_length` gets exactly one more attempt
//! with a prompt stating the shortfall. A second short draft is returned
//! anyway; the reviewer and the length post-check have the final say.

use super::{generate, prompts, StageId};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::exec_ctx::ExecCtx;
use crate::retry::{with_retry, RetryDecision, RetryPolicy};
use crate::types::{content_length, Draft, Strategy};
use crate::PipelineError;
use std::time::Duration;
use tracing::{info, warn};

/// Attempts the writer makes at most.
pub const MAX_ATTEMPTS: u32 = 2;

/// Write a draft from `strategy`.
pub async fn run(ctx: &ExecCtx, config: &PipelineConfig, strategy: &Strategy) -> Result<Draft> {
    write(ctx, config, strategy)
        .await
        .map_err(|e| PipelineError::stage(StageId::Writer, e))
}

async fn write(ctx: &ExecCtx, config: &PipelineConfig, strategy: &Strategy) -> Result<Draft> {
    let min = config.min_content_length;
    let base = prompts::writer(strategy, min);
    let base = base.as_str();
    let system = config.prompts.writer.as_str();

    let outcome = with_retry(
        &RetryPolicy::new(MAX_ATTEMPTS),
        |_, previous: Option<&Result<String>>| {
            let prompt = match previous {
                Some(Ok(text)) => prompts::writer_retry(base, content_length(text), min),
                _ => base.to_string(),
            };
            async move {
                generate(ctx, config, StageId::Writer, system, prompt, config.budgets.writer).await
            }
        },
        |result, attempt| match result {
            Ok(text) if content_length(text) < min => {
                warn!(
                    attempt,
                    length = content_length(text),
                    min_length = min,
                    "draft below minimum length"
                );
                RetryDecision::RetryAfter(Duration::ZERO)
            }
            _ => RetryDecision::Done,
        },
    )
    .await;

    let draft = Draft::new(outcome.result?, outcome.attempts);
    info!(length = draft.word_count, attempts = draft.attempts, "draft ready");
    Ok(draft)
}
