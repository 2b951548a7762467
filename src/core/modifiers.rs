//! Single-step modifiers: conditional selection, deadlines and the no-op.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;

use super::context::Context;
use super::step::{SharedStep, Step};
use crate::domain::Outcome;

/// Step that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct Nop;

#[async_trait]
impl Step for Nop {
    fn description(&self) -> String {
        "Nop".to_string()
    }

    async fn run(&self, _ctx: &Context) -> Outcome {
        Outcome::done()
    }
}

static NOP: OnceLock<SharedStep> = OnceLock::new();

/// The canonical shared no-op step
pub fn nop() -> SharedStep {
    NOP.get_or_init(|| Arc::new(Nop)).clone()
}

/// `step` when `predicate` holds, otherwise [`nop`].
///
/// Decided once at assembly time; the predicate is not re-evaluated per run.
pub fn when(predicate: bool, step: SharedStep) -> SharedStep {
    if predicate {
        step
    } else {
        nop()
    }
}

struct Timeout {
    timeout: Duration,
    inner: SharedStep,
}

#[async_trait]
impl Step for Timeout {
    fn description(&self) -> String {
        format!("Timeout({}, {:?})", self.inner.description(), self.timeout)
    }

    async fn run(&self, ctx: &Context) -> Outcome {
        let (ctx, _guard) = ctx.with_timeout(self.timeout);
        self.inner.run(&ctx).await
    }
}

/// Run `step` under a context that expires `timeout` from when it starts.
///
/// The derived context is released whenever the inner step returns. Expiry
/// is only seen by steps that observe their context; the wrapper does not
/// turn it into a signal on its own.
pub fn timeout(timeout: Duration, step: SharedStep) -> SharedStep {
    Arc::new(Timeout {
        timeout,
        inner: step,
    })
}
