#![forbid(unsafe_code)]

//! Step model for chained API-call flows: step types and their metadata,
//! forwarded inputs, payload codecs and execution telemetry.

pub mod codec;
pub mod error;
pub mod executor;
pub mod forwarding;
pub mod shuffle;
pub mod step;
pub mod telemetry;

pub use crate::codec::{Codec, JsonCodec, YamlCodec};
pub use crate::error::{CodecError, FlowError, RouteError, TransportError};
pub use crate::executor::RequestExecutor;
pub use crate::forwarding::{ForwardedInputs, InputForwardingMap};
pub use crate::shuffle::shuffle;
pub use crate::step::{
    ClientConfig, DescriptorRegistry, HttpVerb, Step, StepContext, StepDescriptor, StepInstance,
};
pub use crate::telemetry::{ExecutionRecord, RequestInfo, ResponseInfo, Statistics};
