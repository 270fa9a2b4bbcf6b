use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::FlowError;
use crate::forwarding::InputForwardingMap;
use crate::step::{ClientConfig, Step, StepDescriptor};

/// One kind of step in a flow, typed by the endpoint it calls.
///
/// Implementors are usually unit structs; the orchestrator never holds a
/// value of the implementing type, only [`Step<Self>`] instances built from
/// it. Hooks receive the instance being prepared and the inputs forwarded by
/// earlier steps.
///
/// ```ignore
/// struct Users;
///
/// impl StepContext for Users {
///     type Value = Vec<User>;
///
///     fn descriptor() -> StepDescriptor {
///         StepDescriptor::get("/Users")
///     }
///
///     fn apply_context(_: &mut Step<Self>, _: &InputForwardingMap) -> Result<(), FlowError> {
///         Ok(())
///     }
/// }
/// ```
pub trait StepContext: Sized + 'static {
    /// Payload bound to the step: request body going out, response body coming back.
    type Value: Serialize + DeserializeOwned + Send + Sync + 'static;

    fn descriptor() -> StepDescriptor;

    fn name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Value bound before execution. Steps that send a body seed it here.
    fn initial_value() -> Option<Self::Value> {
        None
    }

    /// Reads forwarded inputs and binds them into the step's value or endpoint.
    ///
    /// Runs before execution (when the step already holds a value, or in
    /// aggregate mode) and again against the response-backed instance.
    fn apply_context(step: &mut Step<Self>, inputs: &InputForwardingMap) -> Result<(), FlowError>;

    fn configure_endpoint(
        _step: &mut Step<Self>,
        _inputs: &InputForwardingMap,
        _randomize: bool,
    ) -> Result<(), FlowError> {
        Ok(())
    }

    fn configure_client(_client: &mut ClientConfig) {}
}
