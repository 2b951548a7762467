//! Run every step on the calling task and merge all outcomes.

use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::SliceRandom;

use super::context::Context;
use super::step::{collect_steps, describe_group, SharedStep, Step};
use crate::domain::{CompositionError, Outcome};

struct Join {
    steps: Vec<SharedStep>,
    shuffle: bool,
}

#[async_trait]
impl Step for Join {
    fn description(&self) -> String {
        let head = if self.shuffle { "Join" } else { "JoinOrdered" };
        describe_group(head, &self.steps)
    }

    async fn run(&self, ctx: &Context) -> Outcome {
        let mut order: Vec<&SharedStep> = self.steps.iter().collect();
        if self.shuffle {
            order.shuffle(&mut rand::thread_rng());
        }

        let mut merged = Outcome::done();
        for step in order {
            merged = merged.merge(step.run(ctx).await);
        }
        merged
    }
}

fn build(
    combinator: &'static str,
    steps: impl IntoIterator<Item = SharedStep>,
    shuffle: bool,
) -> Result<SharedStep, CompositionError> {
    let mut steps = collect_steps(combinator, steps)?;
    if steps.len() == 1 {
        return Ok(steps.remove(0));
    }
    Ok(Arc::new(Join { steps, shuffle }))
}

/// Run all `steps` one at a time in a fresh random order on every run and
/// merge their outcomes.
///
/// Nothing short-circuits. The merged outcome does not depend on the order,
/// which is shuffled so callers cannot come to rely on one.
pub fn join(steps: impl IntoIterator<Item = SharedStep>) -> Result<SharedStep, CompositionError> {
    build("Join", steps, true)
}

/// Like [`join`], but always in the given order.
pub fn join_ordered(
    steps: impl IntoIterator<Item = SharedStep>,
) -> Result<SharedStep, CompositionError> {
    build("JoinOrdered", steps, false)
}
