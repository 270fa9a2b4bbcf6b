use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::error::{CodecError, FlowError, RouteError};
use crate::executor::RequestExecutor;
use crate::forwarding::InputForwardingMap;
use crate::step::{ClientConfig, StepContext, StepDescriptor};

/// One execution of step type `C`.
pub struct Step<C: StepContext> {
    descriptor: Arc<StepDescriptor>,
    endpoint: String,
    value: Option<C::Value>,
    has_body: bool,
    client: ClientConfig,
    executor: Arc<dyn RequestExecutor>,
    _context: PhantomData<fn() -> C>,
}

impl<C: StepContext> Step<C> {
    pub fn new(
        descriptor: Arc<StepDescriptor>,
        value: Option<C::Value>,
        executor: Arc<dyn RequestExecutor>,
    ) -> Self {
        Self {
            has_body: descriptor.has_body,
            descriptor,
            endpoint: String::new(),
            value,
            client: ClientConfig::default(),
            executor,
            _context: PhantomData,
        }
    }

    pub fn descriptor(&self) -> &StepDescriptor {
        &self.descriptor
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn set_endpoint(&mut self, endpoint: impl Into<String>) {
        self.endpoint = endpoint.into();
    }

    pub fn value(&self) -> Option<&C::Value> {
        self.value.as_ref()
    }

    pub fn value_mut(&mut self) -> Option<&mut C::Value> {
        self.value.as_mut()
    }

    pub fn set_value(&mut self, value: C::Value) {
        self.value = Some(value);
    }

    pub fn take_value(&mut self) -> Option<C::Value> {
        self.value.take()
    }

    pub fn value_type(&self) -> &'static str {
        std::any::type_name::<C::Value>()
    }

    pub fn has_body(&self) -> bool {
        self.has_body
    }

    pub fn set_has_body(&mut self, has_body: bool) {
        self.has_body = has_body;
    }

    pub fn client(&self) -> &ClientConfig {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut ClientConfig {
        &mut self.client
    }

    pub fn executor(&self) -> &Arc<dyn RequestExecutor> {
        &self.executor
    }

    /// Payload sent on the wire; always derived from the bound value.
    pub fn object_value(&self) -> Result<Option<JsonValue>, CodecError> {
        self.value
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(CodecError::from)
    }

    /// Replaces the endpoint with the route declared for `C`.
    pub fn resolve_endpoint_url(&mut self) -> Result<(), FlowError> {
        let route = self.descriptor.route.as_deref().ok_or_else(|| RouteError::Missing {
            step: C::name().to_string(),
        })?;
        if route.trim().is_empty() {
            return Err(RouteError::Empty {
                step: C::name().to_string(),
            }
            .into());
        }
        self.endpoint = route.to_string();
        Ok(())
    }

    /// Appends `name=value`, with `&` when the endpoint already has a query string.
    pub fn append_query(&mut self, name: &str, value: impl fmt::Display) {
        let separator = if self.endpoint.contains('?') { '&' } else { '?' };
        self.endpoint.push(separator);
        self.endpoint.push_str(name);
        self.endpoint.push('=');
        self.endpoint.push_str(&value.to_string());
    }

    /// Binds a query parameter computed from the latest forwarded `T`.
    pub fn configure_endpoint_from<T, V, F>(
        &mut self,
        inputs: &InputForwardingMap,
        name: &str,
        binding: F,
    ) -> Result<(), FlowError>
    where
        T: StepContext,
        V: fmt::Display,
        F: FnOnce(&Step<T>) -> V,
    {
        let input = inputs.latest::<T>(C::name())?;
        let value = binding(&*input);
        self.append_query(name, value);
        Ok(())
    }

    /// Mutates the bound value from the latest forwarded `T`.
    ///
    /// Missing input is an error even when no value is bound yet; an unbound
    /// value just skips the callback.
    pub fn configure_model<T, F>(&mut self, inputs: &InputForwardingMap, bind: F) -> Result<(), FlowError>
    where
        T: StepContext,
        F: FnOnce(&Step<T>, &mut C::Value),
    {
        let input = inputs.latest::<T>(C::name())?;
        if let Some(value) = self.value.as_mut() {
            bind(&*input, value);
        }
        Ok(())
    }
}

impl<C: StepContext> fmt::Debug for Step<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("step", &C::name())
            .field("endpoint", &self.endpoint)
            .field("has_body", &self.has_body)
            .field("has_value", &self.value.is_some())
            .finish()
    }
}

/// Type-erased view of a [`Step`], used by the chain, the forwarding map and executors.
pub trait StepInstance: Send + Sync + 'static {
    fn step_name(&self) -> &'static str;
    fn context_type(&self) -> TypeId;
    fn descriptor(&self) -> &StepDescriptor;
    fn endpoint(&self) -> &str;
    fn has_body(&self) -> bool;
    fn client(&self) -> &ClientConfig;
    fn value_type(&self) -> &'static str;
    fn object_value(&self) -> Result<Option<JsonValue>, CodecError>;

    /// Builds a fresh instance of the same step type around a response value,
    /// sharing this instance's descriptor and executor.
    fn materialize(&self, value: Option<JsonValue>) -> Result<Box<dyn StepInstance>, FlowError>;

    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<C: StepContext> StepInstance for Step<C> {
    fn step_name(&self) -> &'static str {
        C::name()
    }

    fn context_type(&self) -> TypeId {
        TypeId::of::<C>()
    }

    fn descriptor(&self) -> &StepDescriptor {
        &self.descriptor
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn has_body(&self) -> bool {
        self.has_body
    }

    fn client(&self) -> &ClientConfig {
        &self.client
    }

    fn value_type(&self) -> &'static str {
        Step::<C>::value_type(self)
    }

    fn object_value(&self) -> Result<Option<JsonValue>, CodecError> {
        Step::<C>::object_value(self)
    }

    fn materialize(&self, value: Option<JsonValue>) -> Result<Box<dyn StepInstance>, FlowError> {
        let value = value
            .map(serde_json::from_value::<C::Value>)
            .transpose()
            .map_err(|e| FlowError::ResponseDecode {
                step: C::name().to_string(),
                source: e.into(),
            })?;
        Ok(Box::new(Step::<C>::new(
            self.descriptor.clone(),
            value,
            self.executor.clone(),
        )))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl fmt::Debug for dyn StepInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepInstance")
            .field("step", &self.step_name())
            .field("endpoint", &self.endpoint())
            .field("has_body", &self.has_body())
            .finish()
    }
}
