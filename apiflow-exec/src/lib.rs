#![forbid(unsafe_code)]

//! Runtime engine for chained API-call flows.
//!
//! The step model lives in `apiflow-core`; this crate provides the HTTP
//! executor and the [`FlowContext`] orchestrator.

pub mod executor;
pub mod flow;
pub mod sanitize;

pub use apiflow_core as core;

pub use crate::executor::{
    CompositeEventSink, Event, EventSink, ExecutorConfig, HttpClient, HttpDataExtender,
    HttpRequestParts, HttpResponseParts, NoOpEventSink, ReqwestHttpClient, StdoutEventSink,
    TracingEventSink,
};
pub use crate::flow::{FlowContext, OverrideFn};
pub use crate::sanitize::SensitiveHeadersConfig;
