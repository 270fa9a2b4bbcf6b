use async_trait::async_trait;

use crate::error::FlowError;
use crate::forwarding::InputForwardingMap;
use crate::step::StepInstance;
use crate::telemetry::Statistics;

/// Carries out a prepared step and returns the instance(s) built from its result.
///
/// Implementations return instances of the same step type as `step`, usually
/// through [`StepInstance::materialize`]. The HTTP implementation always
/// returns exactly one.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(
        &self,
        step: &dyn StepInstance,
        inputs: &InputForwardingMap,
        statistics: &mut Statistics,
    ) -> Result<Vec<Box<dyn StepInstance>>, FlowError>;
}
