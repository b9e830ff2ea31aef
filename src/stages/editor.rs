//! Editor: polishes wording while preserving voice.

use super::{generate, prompts, StageId};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::exec_ctx::ExecCtx;
use crate::types::{content_length, EditedContent};
use crate::PipelineError;
use tracing::info;

/// Edit `content` (a draft, illustrated or not).
pub async fn run(ctx: &ExecCtx, config: &PipelineConfig, content: &str) -> Result<EditedContent> {
    let edited = generate(
        ctx,
        config,
        StageId::Editor,
        &config.prompts.editor,
        prompts::editor(content),
        config.budgets.editor,
    )
    .await
    .map_err(|e| PipelineError::stage(StageId::Editor, e))?;

    info!(
        before = content_length(content),
        after = content_length(&edited),
        "edit complete"
    );
    Ok(EditedContent {
        content: edited,
        changes: Vec::new(),
    })
}
