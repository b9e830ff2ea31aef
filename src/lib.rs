//! # Article Pipeline
//!
//! A fixed pipeline of LLM agents that turns a topic into a reviewed,
//! optionally illustrated blog article.
//!
//! ```text
//! topic ─► Strategist ─► Writer ─► [Illustrator] ─► Editor ─► Reviewer ─► verdict
//!            Strategy     Draft     IllustratedDraft  EditedContent  ReviewVerdict
//! ```
//!
//! Every stage is one text-generation call through a [`TextBackend`](backend::TextBackend).
//! Structured stages reply in JSON, recovered from messy model output by
//! [`output_parser`]. The illustrator additionally drives an
//! [`ImageBackend`](image::ImageBackend) with per-image retry and rate-limit
//! backoff. Progress goes to an [`EventHandler`](events::EventHandler); the
//! [`transport`] module turns those events into a server-sent-event feed.
//!
//! ## Core Concepts
//!
//! - **[`Pipeline`]**: runs the stages in order and owns the run state.
//! - **[`ExecCtx`]**: shared HTTP client, text and image backends,
//!   transport backoff, and cancellation flag.
//! - **[`PipelineConfig`]**: minimum length, illustration toggle, image
//!   pacing and retries, model, per-stage token budgets and prompts.
//! - **[`ReviewVerdict`]**: the final publishable markdown plus approval.
//!
//! ## Quick Start
//!
//! ```no_run
//! use article_pipeline::events::{AgentEvent, FnEventHandler};
//! use article_pipeline::{ExecCtx, Pipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::builder()
//!         .ctx(ExecCtx::builder().build())
//!         .config(PipelineConfig::from_env()?)
//!         .build()?;
//!
//!     let progress = FnEventHandler(|event: AgentEvent| println!("{}", event.message));
//!     let verdict = pipeline
//!         .run("home office setup", &["productivity".to_string()], &progress)
//!         .await?;
//!
//!     println!("approved: {}\n\n{}", verdict.approved, verdict.markdown);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod exec_ctx;
pub mod image;
pub mod output_parser;
pub mod pipeline;
pub mod prompt;
pub mod publish;
pub mod retry;
pub mod stages;
pub mod transport;
pub mod types;

pub use backend::{AnthropicBackend, BackoffConfig, MockBackend, TextBackend};
#[cfg(feature = "openai")]
pub use backend::OpenAiBackend;
pub use config::{LlmConfig, PipelineConfig, Prompts, StageBudgets};
pub use error::{PipelineError, Result};
pub use events::{AgentEvent, EventHandler, Phase};
pub use exec_ctx::{ExecCtx, ExecCtxBuilder};
pub use image::{ImageBackend, ImageClient, ImageError};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineState};
pub use publish::{PostDraft, PostStatus, PublishedPost, Publisher};
pub use stages::StageId;
pub use transport::{spawn_run, FrameStream, GenerationRequest, StreamFrame};
pub use types::{
    ComplianceChecklist, Draft, EditedContent, IllustratedDraft, IllustrationPlan, ImagePlacement,
    Outline, ReviewVerdict, Section, Strategy,
};
