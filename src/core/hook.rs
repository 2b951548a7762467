//! Lifecycle hooks fired around leaf step execution.

use tracing::{debug, warn};

use super::context::Context;
use crate::domain::{saturating_millis, Outcome};

/// Observes leaf steps immediately before and after their function runs.
///
/// Both methods default to doing nothing, so implementors only override the
/// side they care about.
pub trait LifecycleHook: Send + Sync {
    fn before_step_run(&self, _step: &str, _ctx: &Context) {}

    fn after_step_run(&self, _step: &str, _ctx: &Context, _outcome: &Outcome) {}
}

/// Hook that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyHook;

impl LifecycleHook for EmptyHook {}

/// Hook that reports each leaf run through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHook;

impl LifecycleHook for TracingHook {
    fn before_step_run(&self, step: &str, ctx: &Context) {
        debug!(
            step,
            remaining_ms = ctx.remaining().map(saturating_millis),
            "Step starting"
        );
    }

    fn after_step_run(&self, step: &str, _ctx: &Context, outcome: &Outcome) {
        match outcome.error() {
            Some(error) if error.is_exit() => debug!(step, "Step requested exit"),
            Some(error) => warn!(step, error = %error, "Step failed"),
            None => debug!(
                step,
                requeue = outcome.requeue(),
                requeue_after_ms = outcome.requeue_after_delay().map(saturating_millis),
                "Step finished"
            ),
        }
    }
}
