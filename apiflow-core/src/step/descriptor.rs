use std::any::TypeId;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::step::StepContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpVerb {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// GET requests never carry a body, whatever the step declares.
    pub fn allows_body(self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static metadata of a step type: verb, route template and body flag.
///
/// Declared once per type through [`StepContext::descriptor`]. Nothing is
/// validated at declaration time; a missing route fails endpoint resolution
/// and a missing verb fails execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepDescriptor {
    pub verb: Option<HttpVerb>,
    pub route: Option<Cow<'static, str>>,
    pub has_body: bool,
}

impl StepDescriptor {
    /// Declares nothing. Combine with the `with_*` builders.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(route: impl Into<Cow<'static, str>>) -> Self {
        Self::new().with_verb(HttpVerb::Get).with_route(route)
    }

    pub fn post(route: impl Into<Cow<'static, str>>) -> Self {
        Self::new()
            .with_verb(HttpVerb::Post)
            .with_route(route)
            .with_body(true)
    }

    pub fn put(route: impl Into<Cow<'static, str>>) -> Self {
        Self::new()
            .with_verb(HttpVerb::Put)
            .with_route(route)
            .with_body(true)
    }

    pub fn patch(route: impl Into<Cow<'static, str>>) -> Self {
        Self::new()
            .with_verb(HttpVerb::Patch)
            .with_route(route)
            .with_body(true)
    }

    pub fn delete(route: impl Into<Cow<'static, str>>) -> Self {
        Self::new().with_verb(HttpVerb::Delete).with_route(route)
    }

    pub fn with_verb(mut self, verb: HttpVerb) -> Self {
        self.verb = Some(verb);
        self
    }

    pub fn with_route(mut self, route: impl Into<Cow<'static, str>>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn with_body(mut self, has_body: bool) -> Self {
        self.has_body = has_body;
        self
    }
}

/// Caches each step type's descriptor so it is declared exactly once per flow.
#[derive(Debug, Default)]
pub struct DescriptorRegistry {
    entries: BTreeMap<TypeId, Arc<StepDescriptor>>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve<C: StepContext>(&mut self) -> Arc<StepDescriptor> {
        self.entries
            .entry(TypeId::of::<C>())
            .or_insert_with(|| {
                let descriptor = C::descriptor();
                tracing::debug!(
                    step = C::name(),
                    verb = ?descriptor.verb,
                    route = ?descriptor.route,
                    has_body = descriptor.has_body,
                    "registered step descriptor"
                );
                Arc::new(descriptor)
            })
            .clone()
    }

    pub fn get<C: StepContext>(&self) -> Option<&Arc<StepDescriptor>> {
        self.entries.get(&TypeId::of::<C>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
