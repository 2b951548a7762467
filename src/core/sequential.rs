//! Run steps one after another, stopping at the first that needs requeue.

use async_trait::async_trait;
use tracing::debug;

use super::context::Context;
use super::step::{collect_steps, describe_group, SharedStep, Step};
use crate::domain::{CompositionError, Outcome};

struct Sequential {
    steps: Vec<SharedStep>,
}

#[async_trait]
impl Step for Sequential {
    fn description(&self) -> String {
        describe_group("Sequential", &self.steps)
    }

    async fn run(&self, ctx: &Context) -> Outcome {
        for (idx, step) in self.steps.iter().enumerate() {
            let outcome = step.run(ctx).await;
            if outcome.needs_requeue() {
                debug!(
                    step = %step.description(),
                    skipped = self.steps.len() - idx - 1,
                    "Sequence stopped early"
                );
                return outcome;
            }
        }
        Outcome::done()
    }
}

/// Run `steps` in order on the calling task.
///
/// The first outcome that needs requeue is returned as-is and the remaining
/// steps never run. A single step is returned unchanged.
pub fn sequential(
    steps: impl IntoIterator<Item = SharedStep>,
) -> Result<SharedStep, CompositionError> {
    let mut steps = collect_steps("Sequential", steps)?;
    if steps.len() == 1 {
        return Ok(steps.remove(0));
    }
    Ok(std::sync::Arc::new(Sequential { steps }))
}
