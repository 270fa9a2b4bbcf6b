pub mod events;
mod extender;
pub mod http;
mod types;

pub use events::{
    CompositeEventSink, Event, EventSink, NoOpEventSink, StdoutEventSink, TracingEventSink,
};
pub use extender::HttpDataExtender;
pub use http::{HttpClient, HttpRequestParts, HttpResponseParts, ReqwestHttpClient};
pub use types::ExecutorConfig;
