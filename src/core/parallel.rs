//! Isolated execution: fan-out joins and the `parallel` modifier.
//!
//! Both spawn tokio tasks and wait for them before returning, so callers
//! still observe a plain synchronous step. A task that panics is turned into
//! a `StepError::Panicked` outcome instead of tearing down its caller. Tasks
//! live in a `JoinSet`, so dropping a run before it finishes aborts them.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::{AbortHandle, JoinError, JoinSet};
use tracing::{error, Instrument};

use super::context::Context;
use super::step::{collect_steps, describe_group, SharedStep, Step};
use crate::domain::{CompositionError, ContextError, Outcome, StepError};

fn spawn_isolated(set: &mut JoinSet<Outcome>, step: &SharedStep, ctx: &Context) -> AbortHandle {
    let step = step.clone();
    let ctx = ctx.clone();
    set.spawn(async move { step.run(&ctx).await }.in_current_span())
}

fn settle(step: &SharedStep, joined: Result<Outcome, JoinError>) -> Outcome {
    match joined {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => {
            let description = step.description();
            let message = panic_message(e.into_panic());
            error!(step = %description, %message, "Step panicked");
            Outcome::failed(StepError::Panicked {
                step: description,
                message,
            })
        }
        // Only happens while the runtime is shutting down.
        Err(_) => Outcome::failed(ContextError::Canceled),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

struct JoinInParallel {
    steps: Vec<SharedStep>,
}

#[async_trait]
impl Step for JoinInParallel {
    fn description(&self) -> String {
        describe_group("JoinInParallel", &self.steps)
    }

    async fn run(&self, ctx: &Context) -> Outcome {
        let mut set = JoinSet::new();
        let branches: HashMap<_, _> = self
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| (spawn_isolated(&mut set, step, ctx).id(), i))
            .collect();

        // Barrier: every branch finishes before anything is merged.
        let mut results: Vec<Option<Result<Outcome, JoinError>>> =
            self.steps.iter().map(|_| None).collect();
        while let Some(joined) = set.join_next_with_id().await {
            let (id, result) = match joined {
                Ok((id, outcome)) => (id, Ok(outcome)),
                Err(e) => (e.id(), Err(e)),
            };
            if let Some(&i) = branches.get(&id) {
                results[i] = Some(result);
            }
        }

        // Merged in caller order, not completion order.
        self.steps
            .iter()
            .zip(results)
            .map(|(step, joined)| match joined {
                Some(joined) => settle(step, joined),
                None => Outcome::failed(ContextError::Canceled),
            })
            .fold(Outcome::done(), Outcome::merge)
    }
}

/// Run every step concurrently on its own task, wait for all of them, then
/// merge their outcomes.
///
/// A failing or slow branch never cancels its siblings. A single step is
/// returned unchanged.
pub fn join_in_parallel(
    steps: impl IntoIterator<Item = SharedStep>,
) -> Result<SharedStep, CompositionError> {
    let mut steps = collect_steps("JoinInParallel", steps)?;
    if steps.len() == 1 {
        return Ok(steps.remove(0));
    }
    Ok(Arc::new(JoinInParallel { steps }))
}

struct Parallel {
    inner: SharedStep,
}

#[async_trait]
impl Step for Parallel {
    fn description(&self) -> String {
        format!("Parallel({})", self.inner.description())
    }

    async fn run(&self, ctx: &Context) -> Outcome {
        let mut set = JoinSet::new();
        spawn_isolated(&mut set, &self.inner, ctx);
        match set.join_next().await {
            Some(joined) => settle(&self.inner, joined),
            None => Outcome::failed(ContextError::Canceled),
        }
    }

    fn is_parallel(&self) -> bool {
        true
    }
}

/// Run `step` on its own task and wait for it.
///
/// This isolates the step (a panic becomes an error outcome) without making
/// it concurrent with anything. Wrapping an already-parallel step returns it
/// unchanged.
pub fn parallel(step: SharedStep) -> SharedStep {
    if step.is_parallel() {
        return step;
    }
    Arc::new(Parallel { inner: step })
}
