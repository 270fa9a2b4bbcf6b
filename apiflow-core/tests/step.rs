use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use apiflow_core::{
    DescriptorRegistry, FlowError, InputForwardingMap, RequestExecutor, RouteError, Statistics,
    Step, StepContext, StepDescriptor, StepInstance,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

const BASE: &str = "https://api.example.test";

// Steps built here are never executed.
struct UnusedExecutor;

#[async_trait]
impl RequestExecutor for UnusedExecutor {
    async fn execute(
        &self,
        _step: &dyn StepInstance,
        _inputs: &InputForwardingMap,
        _statistics: &mut Statistics,
    ) -> Result<Vec<Box<dyn StepInstance>>, FlowError> {
        unimplemented!("step tests never execute")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct User {
    id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct UserInformation {
    id: i64,
    email: String,
}

struct Users;

impl StepContext for Users {
    type Value = Vec<User>;

    fn descriptor() -> StepDescriptor {
        StepDescriptor::get(format!("{BASE}/Users"))
    }

    fn apply_context(_: &mut Step<Self>, _: &InputForwardingMap) -> Result<(), FlowError> {
        Ok(())
    }
}

struct UserInformationStep;

impl StepContext for UserInformationStep {
    type Value = UserInformation;

    fn descriptor() -> StepDescriptor {
        StepDescriptor::get(format!("{BASE}/UserInformation"))
    }

    fn apply_context(step: &mut Step<Self>, inputs: &InputForwardingMap) -> Result<(), FlowError> {
        step.configure_model::<Users, _>(inputs, |users, info| {
            info.id = users.value().and_then(|u| u.first()).map(|u| u.id).unwrap_or(0);
        })
    }
}

struct FilteredUserInformation;

impl StepContext for FilteredUserInformation {
    type Value = UserInformation;

    fn descriptor() -> StepDescriptor {
        StepDescriptor::get(format!("{BASE}/UserInformation?verbose=true"))
    }

    fn apply_context(_: &mut Step<Self>, _: &InputForwardingMap) -> Result<(), FlowError> {
        Ok(())
    }
}

struct MissingRoute;

impl StepContext for MissingRoute {
    type Value = UserInformation;

    fn descriptor() -> StepDescriptor {
        StepDescriptor::new().with_verb(apiflow_core::HttpVerb::Get)
    }

    fn apply_context(_: &mut Step<Self>, _: &InputForwardingMap) -> Result<(), FlowError> {
        Ok(())
    }
}

struct EmptyRoute;

impl StepContext for EmptyRoute {
    type Value = UserInformation;

    fn descriptor() -> StepDescriptor {
        StepDescriptor::get("")
    }

    fn apply_context(_: &mut Step<Self>, _: &InputForwardingMap) -> Result<(), FlowError> {
        Ok(())
    }
}

struct CreateUser;

impl StepContext for CreateUser {
    type Value = UserInformation;

    fn descriptor() -> StepDescriptor {
        StepDescriptor::post(format!("{BASE}/Users"))
    }

    fn apply_context(_: &mut Step<Self>, _: &InputForwardingMap) -> Result<(), FlowError> {
        Ok(())
    }
}

static COUNTED_DESCRIPTOR_CALLS: AtomicUsize = AtomicUsize::new(0);

struct Counted;

impl StepContext for Counted {
    type Value = ();

    fn descriptor() -> StepDescriptor {
        COUNTED_DESCRIPTOR_CALLS.fetch_add(1, Ordering::SeqCst);
        StepDescriptor::delete("/counted")
    }

    fn apply_context(_: &mut Step<Self>, _: &InputForwardingMap) -> Result<(), FlowError> {
        Ok(())
    }
}

fn make_step<C: StepContext>(value: Option<C::Value>) -> Step<C> {
    let mut registry = DescriptorRegistry::new();
    Step::new(registry.resolve::<C>(), value, Arc::new(UnusedExecutor))
}

fn users(ids: &[i64]) -> Step<Users> {
    make_step::<Users>(Some(ids.iter().map(|&id| User { id }).collect()))
}

fn forwarded_users(ids: &[i64]) -> InputForwardingMap {
    let mut inputs = InputForwardingMap::new();
    inputs.push(Arc::new(users(ids)));
    inputs
}

#[test]
fn resolve_endpoint_url_uses_declared_route() {
    let mut step = make_step::<UserInformationStep>(None);
    assert_eq!(step.endpoint(), "");
    step.resolve_endpoint_url().unwrap();
    assert_eq!(step.endpoint(), format!("{BASE}/UserInformation"));
}

#[test]
fn resolve_endpoint_url_fails_without_route() {
    let mut step = make_step::<MissingRoute>(None);
    match step.resolve_endpoint_url() {
        Err(FlowError::Route(RouteError::Missing { step })) => {
            assert!(step.ends_with("MissingRoute"));
        }
        other => panic!("expected missing route error, got: {:?}", other),
    }
}

#[test]
fn resolve_endpoint_url_fails_on_empty_route() {
    let mut step = make_step::<EmptyRoute>(None);
    match step.resolve_endpoint_url() {
        Err(FlowError::Route(RouteError::Empty { step })) => {
            assert!(step.ends_with("EmptyRoute"));
        }
        other => panic!("expected empty route error, got: {:?}", other),
    }
}

#[test]
fn configure_endpoint_from_starts_query_string() {
    let inputs = forwarded_users(&[767, 823]);
    let mut step = make_step::<UserInformationStep>(None);
    step.resolve_endpoint_url().unwrap();

    step.configure_endpoint_from::<Users, _, _>(&inputs, "Id", |u| u.value().unwrap()[0].id)
        .unwrap();

    assert_eq!(step.endpoint(), format!("{BASE}/UserInformation?Id=767"));
}

#[test]
fn configure_endpoint_from_extends_existing_query_string() {
    let inputs = forwarded_users(&[767]);
    let mut step = make_step::<FilteredUserInformation>(None);
    step.resolve_endpoint_url().unwrap();

    step.configure_endpoint_from::<Users, _, _>(&inputs, "Id", |u| u.value().unwrap()[0].id)
        .unwrap();
    step.append_query("page", 2);

    assert_eq!(
        step.endpoint(),
        format!("{BASE}/UserInformation?verbose=true&Id=767&page=2")
    );
}

#[test]
fn configure_endpoint_from_reads_most_recent_input() {
    let mut inputs = forwarded_users(&[1]);
    inputs.push(Arc::new(users(&[2])));
    let mut step = make_step::<UserInformationStep>(None);
    step.resolve_endpoint_url().unwrap();

    step.configure_endpoint_from::<Users, _, _>(&inputs, "Id", |u| u.value().unwrap()[0].id)
        .unwrap();

    assert!(step.endpoint().ends_with("?Id=2"));
}

#[test]
fn configure_endpoint_from_without_input_fails() {
    let inputs = InputForwardingMap::new();
    let mut step = make_step::<UserInformationStep>(None);
    step.resolve_endpoint_url().unwrap();

    let err = step
        .configure_endpoint_from::<Users, _, _>(&inputs, "Id", |_| 0)
        .unwrap_err();
    match err {
        FlowError::ModelResolution { step: requester, input } => {
            assert!(requester.ends_with("UserInformationStep"));
            assert!(input.ends_with("Users"));
        }
        other => panic!("expected model resolution error, got: {:?}", other),
    }
    assert_eq!(step.endpoint(), format!("{BASE}/UserInformation"));
}

#[test]
fn configure_model_binds_forwarded_value() {
    let inputs = forwarded_users(&[767, 823]);
    let mut step = make_step::<UserInformationStep>(Some(UserInformation::default()));

    UserInformationStep::apply_context(&mut step, &inputs).unwrap();

    assert_eq!(step.value().unwrap().id, 767);
}

#[test]
fn configure_model_on_unbound_value_skips_callback() {
    let inputs = forwarded_users(&[767]);
    let mut step = make_step::<UserInformationStep>(None);

    UserInformationStep::apply_context(&mut step, &inputs).unwrap();

    assert!(step.value().is_none());
}

#[test]
fn configure_model_without_input_fails_even_when_unbound() {
    let inputs = InputForwardingMap::new();
    let mut step = make_step::<UserInformationStep>(None);

    let err = UserInformationStep::apply_context(&mut step, &inputs).unwrap_err();
    assert!(matches!(err, FlowError::ModelResolution { .. }));
}

#[test]
fn registered_but_empty_input_is_not_forwarded() {
    let mut inputs = InputForwardingMap::new();
    inputs.register::<Users>();
    let mut step = make_step::<UserInformationStep>(Some(UserInformation::default()));

    let err = UserInformationStep::apply_context(&mut step, &inputs).unwrap_err();
    assert!(matches!(err, FlowError::ModelResolution { .. }));
}

#[test]
fn object_value_follows_bound_value() {
    let mut step = make_step::<UserInformationStep>(None);
    assert_eq!(step.object_value().unwrap(), None);

    step.set_value(UserInformation {
        id: 5,
        email: "a@b.test".to_string(),
    });
    assert_eq!(
        step.object_value().unwrap(),
        Some(json!({"id": 5, "email": "a@b.test"}))
    );

    step.value_mut().unwrap().id = 6;
    assert_eq!(step.object_value().unwrap().unwrap()["id"], 6);

    assert_eq!(step.take_value().unwrap().id, 6);
    assert_eq!(step.object_value().unwrap(), None);
}

#[test]
fn body_flag_comes_from_descriptor() {
    assert!(make_step::<CreateUser>(None).has_body());
    let mut get = make_step::<UserInformationStep>(None);
    assert!(!get.has_body());
    get.set_has_body(true);
    assert!(get.has_body());
}

#[test]
fn materialize_builds_instance_of_same_type() {
    let original = make_step::<Users>(None);

    let produced = original
        .materialize(Some(json!([{"id": 767}, {"id": 823}])))
        .unwrap();
    assert_eq!(produced.step_name(), Users::name());
    assert_eq!(produced.value_type(), std::any::type_name::<Vec<User>>());

    let typed = produced.into_any().downcast::<Step<Users>>().unwrap();
    assert_eq!(typed.value().unwrap(), &vec![User { id: 767 }, User { id: 823 }]);
}

#[test]
fn materialize_without_value_leaves_instance_unbound() {
    let original = make_step::<Users>(None);
    let produced = original.materialize(None).unwrap();
    assert_eq!(produced.object_value().unwrap(), None);
}

#[test]
fn materialize_rejects_mismatched_value() {
    let original = make_step::<Users>(None);
    let err = original.materialize(Some(json!({"id": "x"}))).unwrap_err();
    assert!(matches!(err, FlowError::ResponseDecode { .. }));
}

#[test]
fn descriptor_registry_resolves_each_type_once() {
    let mut registry = DescriptorRegistry::new();
    let first = registry.resolve::<Counted>();
    let second = registry.resolve::<Counted>();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(COUNTED_DESCRIPTOR_CALLS.load(Ordering::SeqCst), 1);
    assert_eq!(registry.len(), 1);
    assert!(registry.get::<Users>().is_none());
}
