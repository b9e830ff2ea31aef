//! Progress events emitted by the pipeline.
//!
//! Every stage reports `running`, zero or more `progress` events, then
//! exactly one `completed` or `error`. Implement [`EventHandler`] to receive
//! them for logging, progress bars, or a streaming transport.

use crate::stages::StageId;
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;
use tracing::warn;

/// Lifecycle phase of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    /// The stage has started.
    Running,
    /// Sub-progress inside a stage (1-indexed).
    Progress {
        current: usize,
        total: usize,
    },
    /// The stage finished successfully.
    Completed,
    /// The stage failed; the run is over.
    Error,
}

impl Phase {
    /// `completed` and `error` end a stage.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Error)
    }
}

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentEvent {
    pub stage: StageId,
    #[serde(flatten)]
    pub phase: Phase,
    /// Human-readable message.
    pub message: String,
    /// Stage-specific data, sent with `completed` events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl AgentEvent {
    pub fn new(stage: StageId, phase: Phase, message: impl Into<String>) -> Self {
        Self {
            stage,
            phase,
            message: message.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Handler for pipeline progress events.
///
/// Called inline, in program order. Implementations should return quickly;
/// a panicking handler is logged and ignored.
///
/// # Example
///
/// ```
/// use article_pipeline::events::{AgentEvent, EventHandler};
///
/// struct PrintHandler;
///
/// impl EventHandler for PrintHandler {
///     fn on_event(&self, event: AgentEvent) {
///         println!("[{}] {}", event.stage, event.message);
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    /// Called for every event.
    fn on_event(&self, event: AgentEvent);
}

/// Deliver `event`, containing any panic raised by the handler.
pub(crate) fn emit(handler: &dyn EventHandler, event: AgentEvent) {
    let stage = event.stage;
    if catch_unwind(AssertUnwindSafe(|| handler.on_event(event))).is_err() {
        warn!(stage = stage.as_str(), "event handler panicked; event dropped");
    }
}

/// An [`EventHandler`] backed by a closure.
///
/// # Example
///
/// ```
/// use article_pipeline::events::{AgentEvent, FnEventHandler};
///
/// let handler = FnEventHandler(|event: AgentEvent| {
///     println!("{}: {}", event.stage, event.message);
/// });
/// ```
pub struct FnEventHandler<F: Fn(AgentEvent) + Send + Sync>(pub F);

impl<F: Fn(AgentEvent) + Send + Sync> EventHandler for FnEventHandler<F> {
    fn on_event(&self, event: AgentEvent) {
        (self.0)(event);
    }
}

/// A handler that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl EventHandler for NoopHandler {
    fn on_event(&self, _event: AgentEvent) {}
}

/// Collects events in order, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<AgentEvent>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of every event received so far.
    pub fn events(&self) -> Vec<AgentEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events for one stage.
    pub fn for_stage(&self, stage: StageId) -> Vec<AgentEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.stage == stage)
            .collect()
    }
}

impl EventHandler for RecordingHandler {
    fn on_event(&self, event: AgentEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = AgentEvent::new(StageId::Illustrator, Phase::Progress { current: 2, total: 3 }, "2/3");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["stage"], "illustrator");
        assert_eq!(value["phase"], "progress");
        assert_eq!(value["current"], 2);
        assert!(value.get("payload").is_none());
    }

    #[test]
    fn test_emit_contains_panics() {
        let handler = FnEventHandler(|_event: AgentEvent| panic!("sink exploded"));
        emit(&handler, AgentEvent::new(StageId::Writer, Phase::Running, "go"));
    }

    #[test]
    fn test_recording_handler_keeps_order() {
        let handler = RecordingHandler::new();
        emit(&handler, AgentEvent::new(StageId::Writer, Phase::Running, "a"));
        emit(&handler, AgentEvent::new(StageId::Writer, Phase::Completed, "b"));
        emit(&handler, AgentEvent::new(StageId::Editor, Phase::Running, "c"));
        let writer = handler.for_stage(StageId::Writer);
        assert_eq!(writer.len(), 2);
        assert_eq!(writer[0].phase, Phase::Running);
        assert!(writer[1].phase.is_terminal());
    }
}
