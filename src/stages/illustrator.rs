//! Illustrator: plans image placements, generates them one at a time, and
//! splices each successful image under its heading.
//!
//! Only the planning call can fail the stage. A failed image drops its
//! placement and the loop moves on.

use super::{generate, prompts, StageId};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::exec_ctx::ExecCtx;
use crate::image::ImageClient;
use crate::output_parser::parse_structured;
use crate::types::{Draft, IllustratedDraft, IllustrationPlan, Strategy};
use crate::PipelineError;
use tracing::{info, warn};

/// Characters of the anchor used by the partial heading match.
const PARTIAL_MATCH_CHARS: usize = 10;

/// Illustrate `draft`. `on_progress(current, total)` fires before each image
/// generation, whether or not it succeeds.
pub async fn run(
    ctx: &ExecCtx,
    config: &PipelineConfig,
    draft: &Draft,
    strategy: &Strategy,
    on_progress: &mut (dyn FnMut(usize, usize) + Send),
) -> Result<IllustratedDraft> {
    illustrate(ctx, config, draft, strategy, on_progress)
        .await
        .map_err(|e| PipelineError::stage(StageId::Illustrator, e))
}

async fn illustrate(
    ctx: &ExecCtx,
    config: &PipelineConfig,
    draft: &Draft,
    strategy: &Strategy,
    on_progress: &mut (dyn FnMut(usize, usize) + Send),
) -> Result<IllustratedDraft> {
    let text = generate(
        ctx,
        config,
        StageId::Illustrator,
        &config.prompts.illustrator,
        prompts::illustrator(&draft.content, strategy),
        config.budgets.illustrator,
    )
    .await?;
    let plan: IllustrationPlan = parse_structured(&text)?;
    let total = plan.placements.len();
    info!(placements = total, style = %plan.style, "illustration plan ready");

    let images = ImageClient::from_ctx(ctx).with_retries(config.image_retries);
    let mut content = draft.content.clone();
    let mut accepted = Vec::with_capacity(total);
    let mut image_urls = Vec::with_capacity(total);

    for (i, placement) in plan.placements.into_iter().enumerate() {
        ctx.check_cancelled()?;
        on_progress(i + 1, total);

        match images.generate(&placement.dalle_prompt).await {
            Ok(image) => {
                match insert_image_after_heading(
                    &content,
                    &placement.after_heading,
                    &image.url,
                    &placement.alt_text,
                ) {
                    Some(updated) => content = updated,
                    None => warn!(
                        heading = %placement.after_heading,
                        "no heading matched; image not inserted"
                    ),
                }
                image_urls.push(image.url);
                accepted.push(placement);
            }
            Err(failure) => {
                warn!(
                    index = i + 1,
                    total,
                    error = %failure,
                    "image dropped"
                );
            }
        }

        if i + 1 < total {
            tokio::time::sleep(config.image_delay).await;
        }
    }

    info!(generated = image_urls.len(), planned = total, "illustration complete");
    Ok(IllustratedDraft {
        content,
        images_generated: image_urls.len(),
        placements: accepted,
        image_urls,
    })
}

/// Heading text of an ATX heading line (`#`..`######`), or `None`.
fn heading_text(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let hashes = trimmed.len() - trimmed.trim_start_matches('#').len();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &trimmed[hashes..];
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// Insert `![alt](url)` right after the heading that `anchor` names.
///
/// Matching, case-insensitive, first hit wins:
/// 1. a heading whose text starts with the anchor;
/// 2. a heading containing the anchor's first 10 characters.
///
/// Returns `None` when no heading matches; the caller keeps the content.
pub fn insert_image_after_heading(
    content: &str,
    anchor: &str,
    url: &str,
    alt: &str,
) -> Option<String> {
    let anchor = anchor.trim().trim_start_matches('#').trim().to_lowercase();
    if anchor.is_empty() {
        return None;
    }
    let prefix: String = anchor.chars().take(PARTIAL_MATCH_CHARS).collect();

    let mut headings = Vec::new();
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        if let Some(text) = heading_text(line) {
            headings.push((offset + line.len(), line.ends_with('\n'), text.to_lowercase()));
        }
        offset += line.len();
    }

    let (end, has_newline, _) = headings
        .iter()
        .find(|(_, _, text)| text.starts_with(&anchor))
        .or_else(|| headings.iter().find(|(_, _, text)| text.contains(&prefix)))?;

    let image = format!("\n![{}]({})\n", alt, url);
    let mut out = String::with_capacity(content.len() + image.len() + 1);
    out.push_str(&content[..*end]);
    if !has_newline {
        out.push('\n');
    }
    out.push_str(&image);
    out.push_str(&content[*end..]);
    Some(out)
}
