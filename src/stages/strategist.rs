//! Strategist: topic and keywords in, content plan out.

use super::{generate, prompts, StageId};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::exec_ctx::ExecCtx;
use crate::output_parser::parse_structured;
use crate::types::Strategy;
use crate::PipelineError;
use tracing::info;

/// Plan an article for `topic`.
pub async fn run(
    ctx: &ExecCtx,
    config: &PipelineConfig,
    topic: &str,
    keywords: &[String],
) -> Result<Strategy> {
    plan(ctx, config, topic, keywords)
        .await
        .map_err(|e| PipelineError::stage(StageId::Strategist, e))
}

async fn plan(
    ctx: &ExecCtx,
    config: &PipelineConfig,
    topic: &str,
    keywords: &[String],
) -> Result<Strategy> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(PipelineError::InvalidInput("topic must not be empty".to_string()));
    }

    let text = generate(
        ctx,
        config,
        StageId::Strategist,
        &config.prompts.strategist,
        prompts::strategist(topic, keywords),
        config.budgets.strategist,
    )
    .await?;

    let strategy: Strategy = parse_structured(&text)?;
    info!(
        sections = strategy.outline.body.len(),
        keywords = strategy.keywords.len(),
        "strategy ready"
    );
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockReply};
    use crate::stages::test_support;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_parses_strategy() {
        let mock = Arc::new(MockBackend::fixed(test_support::strategy_json()));
        let ctx = ExecCtx::builder().backend(mock.clone()).build();
        let config = PipelineConfig::default();
        let strategy = run(&ctx, &config, "home office setup", &["productivity".into()])
            .await
            .unwrap();
        assert_eq!(strategy, test_support::strategy());

        let request = &mock.requests()[0];
        assert_eq!(request.system_prompt, config.prompts.strategist);
        assert_eq!(request.config.max_tokens, 2000);
        assert!(request.prompt.contains("productivity"));
    }

    #[tokio::test]
    async fn test_unparseable_response_fails_stage() {
        let mock = Arc::new(MockBackend::fixed("I cannot help with that."));
        let ctx = ExecCtx::builder().backend(mock).build();
        let err = run(&ctx, &PipelineConfig::default(), "desks", &[])
            .await
            .unwrap_err();
        assert_eq!(err.failed_stage(), Some(StageId::Strategist));
        assert!(matches!(
            err,
            PipelineError::StageFailed { ref source, .. }
                if matches!(**source, PipelineError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_provider_error_fails_stage() {
        let mock = Arc::new(MockBackend::new(vec![MockReply::http_error(401, "bad key")]));
        let ctx = ExecCtx::builder().backend(mock).build();
        let err = run(&ctx, &PipelineConfig::default(), "desks", &[])
            .await
            .unwrap_err();
        assert_eq!(err.failed_stage(), Some(StageId::Strategist));
    }

    #[tokio::test]
    async fn test_blank_topic_rejected_without_call() {
        let mock = Arc::new(MockBackend::fixed("{}"));
        let ctx = ExecCtx::builder().backend(mock.clone()).build();
        let err = run(&ctx, &PipelineConfig::default(), "   ", &[])
            .await
            .unwrap_err();
        assert_eq!(err.failed_stage(), Some(StageId::Strategist));
        assert_eq!(mock.calls(), 0);
    }
}
