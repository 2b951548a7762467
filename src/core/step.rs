//! The step capability and leaf construction.
//!
//! Every leaf and every combinator implements [`Step`]. Leaf behaviour only
//! enters the system through [`wrap`] / [`wrap_with_hook`]; everything else
//! is composition over existing steps.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use tracing::Instrument;

use super::context::Context;
use super::hook::{EmptyHook, LifecycleHook};
use crate::domain::{CompositionError, Outcome};

/// A named unit of reconciliation logic
#[async_trait]
pub trait Step: Send + Sync {
    /// Stable, human-readable name used in logs and diagnostics
    fn description(&self) -> String;

    /// Run once under `ctx`. Blocking work must observe the context.
    async fn run(&self, ctx: &Context) -> Outcome;

    /// Whether this step already runs on an isolated task
    fn is_parallel(&self) -> bool {
        false
    }
}

/// Shared handle to a step; children may be reused across parents
pub type SharedStep = Arc<dyn Step>;

type StepFn = dyn Fn(Context) -> BoxFuture<'static, Outcome> + Send + Sync;

/// Leaf step built from a description and an async function
pub struct WrapStep {
    description: String,
    hook: Arc<dyn LifecycleHook>,
    func: Box<StepFn>,
}

impl std::fmt::Debug for WrapStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WrapStep")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Step for WrapStep {
    fn description(&self) -> String {
        self.description.clone()
    }

    async fn run(&self, ctx: &Context) -> Outcome {
        let span = tracing::debug_span!("step", step = %self.description);

        async {
            self.hook.before_step_run(&self.description, ctx);
            let outcome = (self.func)(ctx.clone()).await;
            self.hook.after_step_run(&self.description, ctx, &outcome);
            outcome
        }
        .instrument(span)
        .await
    }
}

/// Build a leaf step from `description` and `f`
///
/// # Example
///
/// ```
/// use ctrlkit::{wrap, Outcome, Step};
///
/// let step = wrap("CheckReplicas", |_ctx| async { Outcome::done() });
/// assert_eq!(step.description(), "CheckReplicas");
/// ```
pub fn wrap<F, Fut>(description: impl Into<String>, f: F) -> SharedStep
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    wrap_with_hook(description, Arc::new(EmptyHook), f)
}

/// Build a leaf step whose runs are reported to `hook`
pub fn wrap_with_hook<F, Fut>(
    description: impl Into<String>,
    hook: Arc<dyn LifecycleHook>,
    f: F,
) -> SharedStep
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    Arc::new(WrapStep {
        description: description.into(),
        hook,
        func: Box::new(move |ctx| f(ctx).boxed()),
    })
}

/// Collect children for a combinator, refusing an empty list up front
pub(crate) fn collect_steps(
    combinator: &'static str,
    steps: impl IntoIterator<Item = SharedStep>,
) -> Result<Vec<SharedStep>, CompositionError> {
    let steps: Vec<SharedStep> = steps.into_iter().collect();
    if steps.is_empty() {
        return Err(CompositionError::Empty { combinator });
    }
    Ok(steps)
}

/// `Head(a, b, c)` from the children's descriptions
pub(crate) fn describe_group(head: &str, steps: &[SharedStep]) -> String {
    let children: Vec<String> = steps.iter().map(|s| s.description()).collect();
    format!("{}({})", head, children.join(", "))
}
