use std::sync::{Arc, Mutex};

use apiflow_exec::{CompositeEventSink, Event, EventSink, NoOpEventSink, TracingEventSink};
use async_trait::async_trait;
use uuid::Uuid;

struct RecordingSink {
    seen: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn emit(&self, event: Event) {
        self.seen.lock().unwrap().push(event.kind());
    }
}

#[test]
fn event_json_carries_kind_and_fields() {
    let flow_id = Uuid::new_v4();

    let started = Event::StepStarted {
        flow_id,
        step: "Users".to_string(),
    }
    .to_json();
    assert_eq!(started["type"], "step.started");
    assert_eq!(started["flow_id"], flow_id.to_string());
    assert_eq!(started["step"], "Users");

    let resolved = Event::EndpointResolved {
        flow_id,
        step: "UserInformation".to_string(),
        endpoint: "/UserInformation?Id=767".to_string(),
    }
    .to_json();
    assert_eq!(resolved["type"], "step.endpoint_resolved");
    assert_eq!(resolved["endpoint"], "/UserInformation?Id=767");

    let succeeded = Event::StepSucceeded {
        flow_id,
        step: "Users".to_string(),
        chain_len: 3,
    }
    .to_json();
    assert_eq!(succeeded["chain_len"], 3);

    let failed = Event::StepFailed {
        flow_id,
        step: "Users".to_string(),
        error: "boom".to_string(),
    }
    .to_json();
    assert_eq!(failed["type"], "step.failed");
    assert_eq!(
        Event::StepFailed {
            flow_id,
            step: "Users".to_string(),
            error: "boom".to_string(),
        }
        .flow_id(),
        flow_id
    );
    assert_eq!(failed["error"], "boom");
}

#[tokio::test]
async fn composite_sink_fans_out_in_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut composite = CompositeEventSink::new();
    composite
        .add(Arc::new(RecordingSink { seen: seen.clone() }))
        .add(Arc::new(NoOpEventSink))
        .add(Arc::new(TracingEventSink))
        .add(Arc::new(RecordingSink { seen: seen.clone() }));
    assert_eq!(composite.len(), 4);

    composite
        .emit(Event::StepStarted {
            flow_id: Uuid::new_v4(),
            step: "Users".to_string(),
        })
        .await;
    composite
        .emit(Event::StepFailed {
            flow_id: Uuid::new_v4(),
            step: "Users".to_string(),
            error: "boom".to_string(),
        })
        .await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["step.started", "step.started", "step.failed", "step.failed"]
    );
}
