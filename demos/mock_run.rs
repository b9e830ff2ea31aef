//! Example: a full illustrated run against mock backends, printed as an SSE feed.
//!
//! Run with: `RUST_LOG=article_pipeline=info cargo run --example mock_run`

use article_pipeline::backend::MockReply;
use article_pipeline::image::MockImageBackend;
use article_pipeline::{spawn_run, ExecCtx, GenerationRequest, MockBackend, Pipeline, PipelineConfig};
use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn article() -> String {
    let mut body = String::from("# Home Office Setup\n\nA short introduction.\n");
    for heading in ["Choosing the Right Desk", "Lighting and Ergonomics", "Cable Management"] {
        body.push_str(&format!("\n## {}\n\n", heading));
        body.push_str(&"Practical, specific advice for remote workers. ".repeat(12));
        body.push('\n');
    }
    body
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let strategy = json!({
        "searchIntent": "Set up a productive home office",
        "targetAudience": "Remote workers",
        "outline": {
            "introduction": ["Why your workspace matters"],
            "body": [
                {"heading": "Choosing the Right Desk", "points": ["Height"]},
                {"heading": "Lighting and Ergonomics", "points": ["Natural light"]},
                {"heading": "Cable Management", "points": ["Trays"]}
            ],
            "conclusion": ["Start small"]
        },
        "keywords": ["home office", "productivity"],
        "metaDescription": "Build a home office that keeps you productive."
    });
    let plan = json!({
        "style": "warm natural photography",
        "placements": [
            {
                "afterHeading": "Choosing the Right Desk",
                "description": "A standing desk by a window",
                "dallePrompt": "A tidy standing desk by a sunny window",
                "altText": "Standing desk by a window"
            },
            {
                "afterHeading": "Cable Management",
                "description": "Cables in a tray",
                "dallePrompt": "Neatly bundled cables in an under-desk tray",
                "altText": "Cable tray under a desk"
            }
        ]
    });
    let verdict = json!({
        "approved": true,
        "markdown": article(),
        "adsenseCompliance": {
            "originalContent": true,
            "hasValue": true,
            "properLength": true,
            "noSpam": true
        },
        "suggestions": ["Add a personal anecdote"]
    });

    let text = MockBackend::new(vec![
        MockReply::text(format!("```json\n{}\n```", strategy)),
        MockReply::text(article()),
        MockReply::text(plan.to_string()),
        MockReply::text(article()),
        MockReply::text(verdict.to_string()),
    ]);
    let ctx = ExecCtx::builder()
        .backend(Arc::new(text))
        .images(Arc::new(MockImageBackend::always("https://img.example/desk.png")))
        .build();
    let config = PipelineConfig::default()
        .with_illustrations(true)
        .with_image_delay(Duration::from_millis(100));
    let pipeline = Arc::new(Pipeline::builder().ctx(ctx).config(config).build()?);

    let request = GenerationRequest::from_json(
        r#"{"topic": "home office setup", "keywords": ["productivity"]}"#,
    )?;
    let mut frames = spawn_run(pipeline, request)?;
    while let Some(frame) = frames.next().await {
        print!("{}", frame.to_sse()?);
    }
    Ok(())
}
