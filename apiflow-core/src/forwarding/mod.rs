//! Inputs forwarded from earlier steps to later ones, keyed by step type.

use std::any::TypeId;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::FlowError;
use crate::shuffle::shuffle;
use crate::step::{Step, StepContext, StepInstance};

#[derive(Debug, Clone)]
pub struct ForwardedInputs {
    pub step: &'static str,
    /// Oldest first.
    pub instances: Vec<Arc<dyn StepInstance>>,
}

/// Per-flow history of produced step instances, one entry per step type.
///
/// Reading a type with no produced instance is always an error: an empty
/// result would hide a flow that runs steps in the wrong order.
#[derive(Debug, Clone, Default)]
pub struct InputForwardingMap {
    entries: BTreeMap<TypeId, ForwardedInputs>,
}

impl InputForwardingMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures an (initially empty) entry exists for `T`.
    pub fn register<T: StepContext>(&mut self) {
        self.entries
            .entry(TypeId::of::<T>())
            .or_insert_with(|| ForwardedInputs {
                step: T::name(),
                instances: Vec::new(),
            });
    }

    /// Appends an instance to the entry of its own step type.
    pub fn push(&mut self, instance: Arc<dyn StepInstance>) {
        let step = instance.step_name();
        self.entries
            .entry(instance.context_type())
            .or_insert_with(|| ForwardedInputs {
                step,
                instances: Vec::new(),
            })
            .instances
            .push(instance);
    }

    pub fn contains<T: StepContext>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    pub fn len_of<T: StepContext>(&self) -> usize {
        self.entries
            .get(&TypeId::of::<T>())
            .map(|e| e.instances.len())
            .unwrap_or(0)
    }

    /// Number of registered step types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.entries.values().map(|e| e.step).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ForwardedInputs> {
        self.entries.values()
    }

    /// Every forwarded `T`, oldest first. `requester` names the step asking.
    pub fn all<T: StepContext>(&self, requester: &str) -> Result<Vec<Arc<Step<T>>>, FlowError> {
        let entry = self
            .entries
            .get(&TypeId::of::<T>())
            .filter(|e| !e.instances.is_empty())
            .ok_or_else(|| FlowError::model_resolution(requester, T::name()))?;

        entry
            .instances
            .iter()
            .map(|instance| {
                instance
                    .clone()
                    .into_any_arc()
                    .downcast::<Step<T>>()
                    .map_err(|_| FlowError::ModelTypeResolution {
                        step: requester.to_string(),
                        value_type: std::any::type_name::<T::Value>().to_string(),
                    })
            })
            .collect()
    }

    /// The most recently forwarded `T`.
    pub fn latest<T: StepContext>(&self, requester: &str) -> Result<Arc<Step<T>>, FlowError> {
        self.all::<T>(requester)?
            .pop()
            .ok_or_else(|| FlowError::model_resolution(requester, T::name()))
    }

    /// Every forwarded `T` in an order drawn from `rng`.
    pub fn shuffled<T: StepContext>(
        &self,
        requester: &str,
        rng: &mut fastrand::Rng,
    ) -> Result<Vec<Arc<Step<T>>>, FlowError> {
        Ok(shuffle(&self.all::<T>(requester)?, rng))
    }
}
