use std::any::TypeId;
use std::sync::Arc;

use apiflow_core::{
    CodecError, DescriptorRegistry, FlowError, InputForwardingMap, RequestExecutor, Statistics,
    Step, StepContext, StepDescriptor, StepInstance,
};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::executor::{Event, EventSink, ExecutorConfig, HttpDataExtender, NoOpEventSink};

/// Caller-supplied replacement for (or, in aggregate mode, addition to) a
/// step's own [`StepContext::apply_context`].
pub type OverrideFn<'a, C> =
    dyn Fn(&mut Step<C>, &InputForwardingMap) -> Result<(), FlowError> + Send + Sync + 'a;

/// Drives a chain of steps, one `run` at a time.
///
/// Each run registers the step type, forwards the previous step's outputs,
/// prepares a fresh instance, executes it through the configured
/// [`RequestExecutor`], prepares the response-backed instance the same way
/// and appends it to the chain. Runs are strictly sequential and a failed run
/// leaves the chain untouched.
pub struct FlowContext {
    flow_id: Uuid,
    executor: Arc<dyn RequestExecutor>,
    event_sink: Arc<dyn EventSink>,
    descriptors: DescriptorRegistry,
    inputs: InputForwardingMap,
    chain: Vec<Arc<dyn StepInstance>>,
    response: Vec<Arc<dyn StepInstance>>,
    previous: Option<(TypeId, &'static str)>,
    // Produced by the last run, forwarded at the start of the next one.
    pending: Vec<Arc<dyn StepInstance>>,
    statistics: Statistics,
    randomize_inputs: bool,
}

impl std::fmt::Debug for FlowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowContext")
            .field("flow_id", &self.flow_id)
            .field("descriptors", &self.descriptors)
            .field("inputs", &self.inputs)
            .field("chain_len", &self.chain.len())
            .field("response_len", &self.response.len())
            .field("previous", &self.previous)
            .field("pending_len", &self.pending.len())
            .field("statistics", &self.statistics)
            .field("randomize_inputs", &self.randomize_inputs)
            .finish_non_exhaustive()
    }
}

impl Default for FlowContext {
    fn default() -> Self {
        Self::http(ExecutorConfig::default())
    }
}

impl FlowContext {
    pub fn new(executor: Arc<dyn RequestExecutor>) -> Self {
        Self {
            flow_id: Uuid::new_v4(),
            executor,
            event_sink: Arc::new(NoOpEventSink),
            descriptors: DescriptorRegistry::new(),
            inputs: InputForwardingMap::new(),
            chain: Vec::new(),
            response: Vec::new(),
            previous: None,
            pending: Vec::new(),
            statistics: Statistics::new(),
            randomize_inputs: false,
        }
    }

    /// Flow over HTTP (reqwest + JSON).
    pub fn http(config: ExecutorConfig) -> Self {
        Self::new(Arc::new(HttpDataExtender::with_config(config)))
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Passed to every [`StepContext::configure_endpoint`] hook.
    pub fn randomize_inputs(mut self, randomize: bool) -> Self {
        self.randomize_inputs = randomize;
        self
    }

    pub fn flow_id(&self) -> Uuid {
        self.flow_id
    }

    /// Runs `C`, applying its own context when it holds a value.
    pub async fn run<C: StepContext>(&mut self) -> Result<&mut Self, FlowError> {
        self.execute::<C>(None, false).await
    }

    /// Runs `C` with `override_context` in place of its own `apply_context`.
    pub async fn run_with<C, F>(&mut self, override_context: F) -> Result<&mut Self, FlowError>
    where
        C: StepContext,
        F: Fn(&mut Step<C>, &InputForwardingMap) -> Result<(), FlowError> + Send + Sync,
    {
        let override_context: &OverrideFn<'_, C> = &override_context;
        self.execute::<C>(Some(override_context), false).await
    }

    /// Runs `C` applying both its own context and `override_context`.
    pub async fn run_aggregate<C, F>(&mut self, override_context: F) -> Result<&mut Self, FlowError>
    where
        C: StepContext,
        F: Fn(&mut Step<C>, &InputForwardingMap) -> Result<(), FlowError> + Send + Sync,
    {
        let override_context: &OverrideFn<'_, C> = &override_context;
        self.execute::<C>(Some(override_context), true).await
    }

    /// Runs `C` in aggregate mode with no override: its own context always applies.
    pub async fn run_aggregate_default<C: StepContext>(&mut self) -> Result<&mut Self, FlowError> {
        self.execute::<C>(None, true).await
    }

    pub async fn execute<C: StepContext>(
        &mut self,
        override_context: Option<&OverrideFn<'_, C>>,
        aggregate: bool,
    ) -> Result<&mut Self, FlowError> {
        let descriptor = self.descriptors.resolve::<C>();
        self.inputs.register::<C>();
        self.carry_forward();

        self.event_sink
            .emit(Event::StepStarted {
                flow_id: self.flow_id,
                step: C::name().to_string(),
            })
            .await;

        match self.drive::<C>(descriptor, override_context, aggregate).await {
            Ok(produced) => {
                self.publish::<C>(produced);
                tracing::info!(
                    flow_id = %self.flow_id,
                    step = C::name(),
                    chain_len = self.chain.len(),
                    "step completed"
                );
                self.event_sink
                    .emit(Event::StepSucceeded {
                        flow_id: self.flow_id,
                        step: C::name().to_string(),
                        chain_len: self.chain.len(),
                    })
                    .await;
                Ok(self)
            }
            Err(e) => {
                self.event_sink
                    .emit(Event::StepFailed {
                        flow_id: self.flow_id,
                        step: C::name().to_string(),
                        error: e.to_string(),
                    })
                    .await;
                Err(e)
            }
        }
    }

    fn carry_forward(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        if let Some((_, step)) = self.previous {
            tracing::debug!(
                flow_id = %self.flow_id,
                step,
                forwarded = pending.len(),
                "forwarding previous outputs"
            );
        }
        for instance in pending {
            self.inputs.push(instance);
        }
    }

    async fn drive<C: StepContext>(
        &mut self,
        descriptor: Arc<StepDescriptor>,
        override_context: Option<&OverrideFn<'_, C>>,
        aggregate: bool,
    ) -> Result<Vec<Arc<dyn StepInstance>>, FlowError> {
        let mut step = Step::<C>::new(descriptor, C::initial_value(), self.executor.clone());
        self.apply_lifecycle(&mut step, override_context, aggregate)?;

        self.event_sink
            .emit(Event::EndpointResolved {
                flow_id: self.flow_id,
                step: C::name().to_string(),
                endpoint: step.endpoint().to_string(),
            })
            .await;

        let executor = step.executor().clone();
        let produced = executor
            .execute(&step, &self.inputs, &mut self.statistics)
            .await?;

        produced
            .into_iter()
            .map(|instance| {
                let mut response = downcast_step::<C>(instance)?;
                self.apply_lifecycle(&mut response, override_context, aggregate)?;
                Ok(Arc::new(response) as Arc<dyn StepInstance>)
            })
            .collect()
    }

    fn apply_lifecycle<C: StepContext>(
        &self,
        step: &mut Step<C>,
        override_context: Option<&OverrideFn<'_, C>>,
        aggregate: bool,
    ) -> Result<(), FlowError> {
        step.resolve_endpoint_url()?;
        C::configure_client(step.client_mut());
        C::configure_endpoint(step, &self.inputs, self.randomize_inputs)?;

        let (apply_instance, apply_override) = match (aggregate, override_context) {
            (true, _) => (true, true),
            (false, Some(_)) => (false, true),
            (false, None) => (step.value().is_some(), false),
        };

        if apply_instance {
            C::apply_context(step, &self.inputs)?;
        }
        if apply_override {
            if let Some(override_context) = override_context {
                override_context(step, &self.inputs)?;
            }
        }

        tracing::debug!(
            flow_id = %self.flow_id,
            step = C::name(),
            endpoint = step.endpoint(),
            apply_instance,
            apply_override,
            "applied step context"
        );
        Ok(())
    }

    fn publish<C: StepContext>(&mut self, produced: Vec<Arc<dyn StepInstance>>) {
        self.previous = Some((TypeId::of::<C>(), C::name()));
        self.pending = produced.clone();
        self.chain.extend(produced.iter().cloned());
        self.response = produced;
    }

    /// Instances produced by the most recent run.
    pub fn response(&self) -> &[Arc<dyn StepInstance>] {
        &self.response
    }

    /// The most recent response, typed as `C`.
    pub fn response_as<C: StepContext>(&self) -> Result<Vec<Arc<Step<C>>>, FlowError> {
        self.response
            .iter()
            .map(|instance| {
                instance
                    .clone()
                    .into_any_arc()
                    .downcast::<Step<C>>()
                    .map_err(|_| model_type_error::<C>())
            })
            .collect()
    }

    /// Every produced instance, oldest first.
    pub fn chain(&self) -> &[Arc<dyn StepInstance>] {
        &self.chain
    }

    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }

    pub fn inputs(&self) -> &InputForwardingMap {
        &self.inputs
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn descriptors(&self) -> &DescriptorRegistry {
        &self.descriptors
    }

    /// Name of the step type that produced the most recent output.
    pub fn previous_step(&self) -> Option<&'static str> {
        self.previous.map(|(_, step)| step)
    }

    /// Reshapes the values bound to `instances` into `M`.
    ///
    /// List-valued steps are flattened across all instances into one
    /// collection; any other value is taken from the first instance. Mixing
    /// list and non-list values, or unbound instances, is an error.
    pub fn get_value<C, M>(&self, instances: &[Arc<Step<C>>]) -> Result<M, FlowError>
    where
        C: StepContext,
        M: DeserializeOwned,
    {
        let codec_error = |source: CodecError| FlowError::Codec {
            step: C::name().to_string(),
            source,
        };
        let empty = || FlowError::EmptyResponse {
            step: C::name().to_string(),
        };

        let first = instances.first().ok_or_else(empty)?;
        let first_value = first.object_value().map_err(codec_error)?.ok_or_else(empty)?;

        let value = if first_value.is_array() {
            let mut items = Vec::new();
            for instance in instances {
                match instance.object_value().map_err(codec_error)? {
                    Some(JsonValue::Array(values)) => items.extend(values),
                    Some(_) => {
                        return Err(codec_error(CodecError::Json(serde::de::Error::custom(
                            "cannot flatten a non-list value together with list values",
                        ))))
                    }
                    None => return Err(empty()),
                }
            }
            JsonValue::Array(items)
        } else {
            first_value
        };

        serde_json::from_value(value).map_err(|e| codec_error(e.into()))
    }
}

fn downcast_step<C: StepContext>(instance: Box<dyn StepInstance>) -> Result<Step<C>, FlowError> {
    instance
        .into_any()
        .downcast::<Step<C>>()
        .map(|step| *step)
        .map_err(|_| model_type_error::<C>())
}

fn model_type_error<C: StepContext>() -> FlowError {
    FlowError::ModelTypeResolution {
        step: C::name().to_string(),
        value_type: std::any::type_name::<C::Value>().to_string(),
    }
}
