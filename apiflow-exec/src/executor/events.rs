//! Flow lifecycle events and the sinks that receive them.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "step.started")]
    StepStarted { flow_id: Uuid, step: String },
    /// The endpoint the step will be sent to, before any base URL is applied.
    #[serde(rename = "step.endpoint_resolved")]
    EndpointResolved {
        flow_id: Uuid,
        step: String,
        endpoint: String,
    },
    #[serde(rename = "step.succeeded")]
    StepSucceeded {
        flow_id: Uuid,
        step: String,
        chain_len: usize,
    },
    #[serde(rename = "step.failed")]
    StepFailed {
        flow_id: Uuid,
        step: String,
        error: String,
    },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::StepStarted { .. } => "step.started",
            Event::EndpointResolved { .. } => "step.endpoint_resolved",
            Event::StepSucceeded { .. } => "step.succeeded",
            Event::StepFailed { .. } => "step.failed",
        }
    }

    pub fn flow_id(&self) -> Uuid {
        match self {
            Event::StepStarted { flow_id, .. }
            | Event::EndpointResolved { flow_id, .. }
            | Event::StepSucceeded { flow_id, .. }
            | Event::StepFailed { flow_id, .. } => *flow_id,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: Event);
}

/// Fans every event out to its sinks, in the order they were added.
#[derive(Default)]
pub struct CompositeEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sink: Arc<dyn EventSink>) -> &mut Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl EventSink for CompositeEventSink {
    async fn emit(&self, event: Event) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }
}

/// One JSON object per line.
pub struct StdoutEventSink;

#[async_trait]
impl EventSink for StdoutEventSink {
    async fn emit(&self, event: Event) {
        println!("{}", event.to_json());
    }
}

pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: Event) {
        let flow_id = event.flow_id();
        match &event {
            Event::StepFailed { step, error, .. } => {
                tracing::warn!(%flow_id, step = %step, error = %error, "step failed");
            }
            Event::StepSucceeded { step, chain_len, .. } => {
                tracing::info!(%flow_id, step = %step, chain_len, "step succeeded");
            }
            other => {
                tracing::debug!(%flow_id, event = %other.to_json(), "{}", other.kind());
            }
        }
    }
}

pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: Event) {}
}
