mod client;
mod context;
mod descriptor;
mod instance;

pub use client::ClientConfig;
pub use context::StepContext;
pub use descriptor::{DescriptorRegistry, HttpVerb, StepDescriptor};
pub use instance::{Step, StepInstance};
