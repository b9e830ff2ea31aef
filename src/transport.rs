//! Streaming transport adapter: pipeline events as a push feed.
//!
//! [`spawn_run`] runs a pipeline on a tokio task and returns a
//! [`FrameStream`] of [`StreamFrame`]s, ending with exactly one
//! [`StreamFrame::Complete`] or [`StreamFrame::Error`]. Each frame renders
//! as a server-sent event with [`StreamFrame::to_sse`]. Dropping the stream
//! aborts the run and abandons any in-flight provider call.

use crate::error::Result;
use crate::events::{AgentEvent, EventHandler, Phase};
use crate::pipeline::Pipeline;
use crate::stages::StageId;
use crate::types::ReviewVerdict;
use crate::PipelineError;
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;
use tracing::debug;

/// Stage status carried by a [`StreamFrame::Status`] frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameStatus {
    Running,
    Completed,
    Error,
}

/// One message of the event feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamFrame {
    /// Stage lifecycle and sub-progress.
    Status {
        agent: StageId,
        status: FrameStatus,
        message: String,
    },
    /// A stage's completion payload.
    Output { agent: StageId, data: Value },
    /// The run finished with a verdict.
    Complete { data: ReviewVerdict },
    /// The run failed.
    Error { message: String },
}

impl StreamFrame {
    /// Render as `data: <json>\n\n`.
    pub fn to_sse(&self) -> Result<String> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }

    /// Whether this frame ends the feed.
    pub fn is_final(&self) -> bool {
        matches!(self, StreamFrame::Complete { .. } | StreamFrame::Error { .. })
    }

    /// Frames for one pipeline event.
    ///
    /// A `completed` event with a payload becomes an `output` frame followed
    /// by a `status` frame.
    pub fn from_event(event: AgentEvent) -> Vec<StreamFrame> {
        let agent = event.stage;
        let status = |status, message| StreamFrame::Status {
            agent,
            status,
            message,
        };
        match event.phase {
            Phase::Running | Phase::Progress { .. } => {
                vec![status(FrameStatus::Running, event.message)]
            }
            Phase::Error => vec![status(FrameStatus::Error, event.message)],
            Phase::Completed => {
                let mut frames = Vec::with_capacity(2);
                if let Some(data) = event.payload {
                    frames.push(StreamFrame::Output { agent, data });
                }
                frames.push(status(FrameStatus::Completed, event.message));
                frames
            }
        }
    }
}

/// An [`EventHandler`] that forwards frames into an unbounded channel.
///
/// Never blocks. Frames sent after the receiver is gone are dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<StreamFrame>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<StreamFrame>) -> Self {
        Self { tx }
    }

    /// Send a frame, ignoring a closed receiver.
    pub fn send(&self, frame: StreamFrame) {
        if self.tx.unbounded_send(frame).is_err() {
            debug!("frame receiver closed; frame dropped");
        }
    }
}

impl EventHandler for ChannelSink {
    fn on_event(&self, event: AgentEvent) {
        for frame in StreamFrame::from_event(event) {
            self.send(frame);
        }
    }
}

/// Body of a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub topic: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            keywords: Vec::new(),
        }
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    /// Parse and validate a JSON request body.
    pub fn from_json(body: &str) -> Result<Self> {
        let request: GenerationRequest = serde_json::from_str(body)
            .map_err(|e| PipelineError::InvalidInput(format!("malformed request: {}", e)))?;
        request.validated()
    }

    /// Trim the topic and keywords, drop blank keywords, and reject a blank topic.
    pub fn validated(self) -> Result<Self> {
        let topic = self.topic.trim().to_string();
        if topic.is_empty() {
            return Err(PipelineError::InvalidInput(
                "topic must not be empty".to_string(),
            ));
        }
        let keywords = self
            .keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        Ok(Self { topic, keywords })
    }
}

/// Frames of a spawned run. Dropping it aborts the run.
#[derive(Debug)]
pub struct FrameStream {
    rx: UnboundedReceiver<StreamFrame>,
    task: JoinHandle<()>,
}

impl Stream for FrameStream {
    type Item = StreamFrame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StreamFrame>> {
        self.rx.poll_next_unpin(cx)
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Run `pipeline` for `request` on a tokio task and stream its frames.
///
/// The request is validated before anything is spawned.
pub fn spawn_run(pipeline: Arc<Pipeline>, request: GenerationRequest) -> Result<FrameStream> {
    let request = request.validated()?;
    let (tx, rx) = unbounded();
    let task = tokio::spawn(async move {
        let sink = ChannelSink::new(tx);
        let frame = match pipeline.run(&request.topic, &request.keywords, &sink).await {
            Ok(verdict) => StreamFrame::Complete { data: verdict },
            Err(e) => StreamFrame::Error {
                message: e.to_string(),
            },
        };
        sink.send(frame);
    });
    Ok(FrameStream { rx, task })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockReply};
    use crate::stages::test_support::{article, strategy_json, verdict_json};
    use crate::ExecCtx;

    fn pipeline(replies: Vec<MockReply>) -> Arc<Pipeline> {
        let ctx = ExecCtx::builder()
            .backend(Arc::new(MockBackend::new(replies)))
            .build();
        Arc::new(Pipeline::builder().ctx(ctx).build().unwrap())
    }

    #[test]
    fn test_sse_rendering() {
        let frame = StreamFrame::Status {
            agent: StageId::Writer,
            status: FrameStatus::Running,
            message: "Writer: drafting".into(),
        };
        let sse = frame.to_sse().unwrap();
        assert!(sse.starts_with("data: {"));
        assert!(sse.ends_with("}\n\n"));
        let value: Value = serde_json::from_str(sse.trim_start_matches("data: ").trim()).unwrap();
        assert_eq!(value["type"], "status");
        assert_eq!(value["agent"], "writer");
        assert_eq!(value["status"], "running");
    }

    #[test]
    fn test_completed_event_yields_output_then_status() {
        let event = AgentEvent::new(StageId::Writer, Phase::Completed, "done")
            .with_payload(serde_json::json!({"wordCount": 1800}));
        let frames = StreamFrame::from_event(event);
        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[0], StreamFrame::Output { ref data, .. } if data["wordCount"] == 1800));
        assert!(matches!(
            frames[1],
            StreamFrame::Status {
                status: FrameStatus::Completed,
                ..
            }
        ));
    }

    #[test]
    fn test_request_validation() {
        let request = GenerationRequest::from_json(
            r#"{"topic": "  home office setup ", "keywords": ["productivity", " "]}"#,
        )
        .unwrap();
        assert_eq!(request.topic, "home office setup");
        assert_eq!(request.keywords, vec!["productivity"]);

        assert!(GenerationRequest::from_json(r#"{"topic": ""}"#).is_err());
        assert!(GenerationRequest::from_json(r#"{"keywords": []}"#).is_err());
        assert!(GenerationRequest::from_json(r#"{"topic": "desks"}"#).is_ok());
    }

    #[tokio::test]
    async fn test_spawned_run_ends_with_complete() {
        let pipeline = pipeline(vec![
            MockReply::text(strategy_json()),
            MockReply::text(article(1800)),
            MockReply::text(article(1800)),
            MockReply::text(verdict_json(true, true, &article(1800))),
        ]);
        let request = GenerationRequest::new("home office setup")
            .with_keywords(vec!["productivity".into()]);
        let frames: Vec<StreamFrame> = spawn_run(pipeline, request).unwrap().collect().await;

        let last = frames.last().unwrap();
        assert!(matches!(last, StreamFrame::Complete { data } if data.approved));
        assert_eq!(frames.iter().filter(|f| f.is_final()).count(), 1);
        let outputs = frames
            .iter()
            .filter(|f| matches!(f, StreamFrame::Output { .. }))
            .count();
        assert_eq!(outputs, 4);
    }

    #[tokio::test]
    async fn test_spawned_run_ends_with_error() {
        let pipeline = pipeline(vec![
            MockReply::text(strategy_json()),
            MockReply::http_error(503, "overloaded"),
        ]);
        let frames: Vec<StreamFrame> = spawn_run(pipeline, GenerationRequest::new("desks"))
            .unwrap()
            .collect()
            .await;

        let n = frames.len();
        assert!(matches!(
            &frames[n - 2],
            StreamFrame::Status { agent: StageId::Writer, status: FrameStatus::Error, .. }
        ));
        assert!(matches!(&frames[n - 1], StreamFrame::Error { message } if message.contains("Writer")));
    }

    #[test]
    fn test_blank_topic_rejected_before_spawn() {
        let pipeline = pipeline(vec![MockReply::text("{}")]);
        let result = spawn_run(pipeline, GenerationRequest::new("   "));
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
    }
}
