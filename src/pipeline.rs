use crate::{
    config::PipelineConfig,
    error::Result,
    events::{emit, AgentEvent, EventHandler, Phase},
    exec_ctx::ExecCtx,
    stages::{editor, illustrator, reviewer, strategist, writer, StageId},
    types::{content_length, ReviewVerdict},
    PipelineError,
};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Mutex;
use tracing::{info, warn};

/// Where a pipeline is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No run has started.
    Idle,
    /// The given stage is executing.
    Running(StageId),
    /// The last run produced a verdict.
    Completed,
    /// The last run stopped at the given stage.
    Failed(StageId),
    /// The last run observed the cancellation flag.
    Cancelled,
}

/// Runs strategist, writer, (illustrator,) editor and reviewer in order.
///
/// Each stage's artifact feeds the next. The first failure ends the run:
/// one `error` event is emitted for the failing stage and nothing after it
/// runs. The orchestrator retries nothing itself.
///
/// # Example
///
/// ```no_run
/// use article_pipeline::{events::NoopHandler, ExecCtx, Pipeline, PipelineConfig};
///
/// # async fn demo() -> article_pipeline::Result<()> {
/// let pipeline = Pipeline::builder()
///     .ctx(ExecCtx::builder().anthropic("sk-ant-...").build())
///     .config(PipelineConfig::default().with_illustrations(true))
///     .build()?;
/// let verdict = pipeline
///     .run("home office setup", &["productivity".to_string()], &NoopHandler)
///     .await?;
/// println!("approved: {}", verdict.approved);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    ctx: ExecCtx,
    config: PipelineConfig,
    state: Mutex<PipelineState>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("ctx", &self.ctx)
            .field("plan", &self.plan())
            .field("state", &self.state())
            .finish()
    }
}

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// The stages a run executes, in order.
    pub fn plan(&self) -> Vec<StageId> {
        StageId::ALL
            .into_iter()
            .filter(|s| *s != StageId::Illustrator || self.config.illustrate)
            .collect()
    }

    /// Current state.
    pub fn state(&self) -> PipelineState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(PipelineState::Idle)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn ctx(&self) -> &ExecCtx {
        &self.ctx
    }

    fn set_state(&self, state: PipelineState) {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
    }

    /// Turn `topic` into a reviewed article.
    ///
    /// `sink` receives every progress event in program order. The returned
    /// verdict has already been through the length post-check.
    pub async fn run(
        &self,
        topic: &str,
        keywords: &[String],
        sink: &dyn EventHandler,
    ) -> Result<ReviewVerdict> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(PipelineError::InvalidInput(
                "topic must not be empty".to_string(),
            ));
        }
        let ctx = &self.ctx;
        let config = &self.config;
        info!(topic, illustrate = config.illustrate, "pipeline started");

        let strategy = self
            .stage(
                StageId::Strategist,
                sink,
                strategist::run(ctx, config, topic, keywords),
                |strategy| {
                    (
                        format!("Planned {} sections", strategy.outline.body.len()),
                        serde_json::to_value(strategy).unwrap_or(Value::Null),
                    )
                },
            )
            .await?;

        let draft = self
            .stage(
                StageId::Writer,
                sink,
                writer::run(ctx, config, &strategy),
                |draft| {
                    (
                        format!("Wrote {} characters", draft.word_count),
                        json!({"wordCount": draft.word_count, "attempts": draft.attempts}),
                    )
                },
            )
            .await?;

        let content = if config.illustrate {
            let mut on_progress = |current: usize, total: usize| {
                emit(
                    sink,
                    AgentEvent::new(
                        StageId::Illustrator,
                        Phase::Progress { current, total },
                        format!("Generating image {}/{}", current, total),
                    ),
                );
            };
            let illustrated = self
                .stage(
                    StageId::Illustrator,
                    sink,
                    illustrator::run(ctx, config, &draft, &strategy, &mut on_progress),
                    |out| {
                        let anchors: Vec<&str> =
                            out.placements.iter().map(|p| p.after_heading.as_str()).collect();
                        (
                            format!("Generated {} images", out.images_generated),
                            json!({"imagesGenerated": out.images_generated, "placements": anchors}),
                        )
                    },
                )
                .await?;
            illustrated.content
        } else {
            draft.content
        };

        let edited = self
            .stage(
                StageId::Editor,
                sink,
                editor::run(ctx, config, &content),
                |edited| {
                    let length = content_length(&edited.content);
                    (
                        format!("Edited to {} characters", length),
                        json!({"length": length, "changes": edited.changes.len()}),
                    )
                },
            )
            .await?;

        let min_length = config.min_content_length;
        let verdict = self
            .stage(
                StageId::Reviewer,
                sink,
                async {
                    reviewer::run(ctx, config, &edited.content, &strategy)
                        .await
                        .map(|verdict| reviewer::enforce_length_policy(verdict, min_length))
                },
                |verdict| {
                    let message = if verdict.approved {
                        "Approved for publishing"
                    } else {
                        "Not approved"
                    };
                    (
                        message.to_string(),
                        json!({
                            "approved": verdict.approved,
                            "adsenseCompliance": verdict.adsense_compliance,
                            "suggestions": verdict.suggestions,
                        }),
                    )
                },
            )
            .await?;

        self.set_state(PipelineState::Completed);
        info!(approved = verdict.approved, "pipeline completed");
        Ok(verdict)
    }

    /// Run one stage with its `running` / `completed` / `error` events.
    async fn stage<T, Fut, S>(
        &self,
        stage: StageId,
        sink: &dyn EventHandler,
        work: Fut,
        summarize: S,
    ) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
        S: FnOnce(&T) -> (String, Value),
    {
        if let Err(e) = self.ctx.check_cancelled() {
            self.set_state(PipelineState::Cancelled);
            return Err(e);
        }
        self.set_state(PipelineState::Running(stage));
        info!(stage = stage.as_str(), "stage started");
        emit(
            sink,
            AgentEvent::new(
                stage,
                Phase::Running,
                format!("{}: {}", stage.display_name(), stage.description()),
            ),
        );

        let result = work.await;
        if self.ctx.is_cancelled() {
            self.set_state(PipelineState::Cancelled);
            return Err(PipelineError::Cancelled);
        }

        match result {
            Ok(output) => {
                let (message, payload) = summarize(&output);
                info!(stage = stage.as_str(), %message, "stage completed");
                emit(
                    sink,
                    AgentEvent::new(stage, Phase::Completed, message).with_payload(payload),
                );
                Ok(output)
            }
            Err(e) => {
                let err = PipelineError::stage(stage, e);
                warn!(stage = stage.as_str(), error = %err, "stage failed");
                self.set_state(PipelineState::Failed(stage));
                emit(sink, AgentEvent::new(stage, Phase::Error, err.to_string()));
                Err(err)
            }
        }
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    ctx: Option<ExecCtx>,
    config: Option<PipelineConfig>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the execution context. Default: `ExecCtx::builder().build()`.
    pub fn ctx(mut self, ctx: ExecCtx) -> Self {
        self.ctx = Some(ctx);
        self
    }

    /// Set the configuration. Default: [`PipelineConfig::default()`].
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the pipeline, validating configuration.
    pub fn build(self) -> Result<Pipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        Ok(Pipeline {
            ctx: self.ctx.unwrap_or_else(|| ExecCtx::builder().build()),
            config,
            state: Mutex::new(PipelineState::Idle),
        })
    }
}
