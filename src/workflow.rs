//! Workflow definitions and loading.
//!
//! Workflows are defined in YAML as a tree of step specs. Each node is tagged
//! by `kind`; composites nest further specs and leaves simulate the
//! behaviours a reconcile step can report.
//!
//! ```yaml
//! name: rollout
//! root:
//!   kind: sequential
//!   steps:
//!     - kind: sleep
//!       ms: 20
//!     - kind: requeue_after
//!       ms: 5000
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};

use crate::core::{
    exit, join, join_in_parallel, join_ordered, nop, parallel, sequential, timeout, when,
    wrap_with_hook, Context, EmptyHook, LifecycleHook, SharedStep,
};
use crate::domain::{CompositionError, Outcome};

/// A complete workflow definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Workflow name (used in CLI output)
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Root of the step tree
    pub root: StepSpec,
}

/// One node of a workflow's step tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepSpec {
    /// The canonical no-op
    Nop,

    /// Stop the enclosing sequence without failing
    Exit {
        #[serde(default)]
        name: Option<String>,
    },

    /// Sleep while observing the context
    Sleep {
        ms: u64,
        #[serde(default)]
        name: Option<String>,
    },

    /// Ask for an immediate requeue
    Requeue {
        #[serde(default)]
        name: Option<String>,
    },

    /// Ask for a delayed requeue
    RequeueAfter {
        ms: u64,
        #[serde(default)]
        name: Option<String>,
    },

    /// Fail with a message
    Fail {
        message: String,
        #[serde(default)]
        name: Option<String>,
    },

    Sequential {
        steps: Vec<StepSpec>,
    },

    Join {
        steps: Vec<StepSpec>,
    },

    JoinOrdered {
        steps: Vec<StepSpec>,
    },

    JoinInParallel {
        steps: Vec<StepSpec>,
    },

    /// Include `step` only when `enabled`
    When {
        enabled: bool,
        step: Box<StepSpec>,
    },

    Timeout {
        ms: u64,
        step: Box<StepSpec>,
    },

    Parallel {
        step: Box<StepSpec>,
    },
}

impl Workflow {
    /// Load a workflow from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read workflow file: {}", path.display()))?;

        Self::from_yaml(&content)
    }

    /// Parse a workflow from YAML content
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse workflow YAML")
    }

    /// Validate the workflow definition without building it
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            anyhow::bail!("Workflow name cannot be empty");
        }
        self.build(Arc::new(EmptyHook))
            .with_context(|| format!("Workflow '{}' cannot be assembled", self.name))?;
        Ok(())
    }

    /// Assemble the step tree, attaching `hook` to every leaf
    pub fn build(&self, hook: Arc<dyn LifecycleHook>) -> Result<SharedStep, CompositionError> {
        self.root.build(&hook)
    }
}

impl StepSpec {
    /// Assemble this node and its children
    pub fn build(&self, hook: &Arc<dyn LifecycleHook>) -> Result<SharedStep, CompositionError> {
        let step = match self {
            Self::Nop => nop(),
            Self::Exit { name } => leaf(hook, name, "Exit".to_string(), |_| exit()),
            Self::Sleep { ms, name } => {
                let duration = Duration::from_millis(*ms);
                let hook = hook.clone();
                let description = name.clone().unwrap_or_else(|| format!("Sleep({:?})", duration));
                wrap_with_hook(description, hook, move |ctx: Context| async move {
                    match ctx.sleep(duration).await {
                        Ok(()) => Outcome::done(),
                        Err(e) => Outcome::failed(e),
                    }
                })
            }
            Self::Requeue { name } => {
                leaf(hook, name, "Requeue".to_string(), |_| Outcome::requeue_now())
            }
            Self::RequeueAfter { ms, name } => {
                let after = Duration::from_millis(*ms);
                leaf(hook, name, format!("RequeueAfter({:?})", after), move |_| {
                    Outcome::requeue_after(after)
                })
            }
            Self::Fail { message, name } => {
                let message = message.clone();
                leaf(hook, name, format!("Fail({})", message), move |_| {
                    Outcome::failed(anyhow::anyhow!(message.clone()))
                })
            }
            Self::Sequential { steps } => sequential(build_all(steps, hook)?)?,
            Self::Join { steps } => join(build_all(steps, hook)?)?,
            Self::JoinOrdered { steps } => join_ordered(build_all(steps, hook)?)?,
            Self::JoinInParallel { steps } => join_in_parallel(build_all(steps, hook)?)?,
            Self::When { enabled, step } => when(*enabled, step.build(hook)?),
            Self::Timeout { ms, step } => timeout(Duration::from_millis(*ms), step.build(hook)?),
            Self::Parallel { step } => parallel(step.build(hook)?),
        };
        Ok(step)
    }
}

fn build_all(
    specs: &[StepSpec],
    hook: &Arc<dyn LifecycleHook>,
) -> Result<Vec<SharedStep>, CompositionError> {
    specs.iter().map(|spec| spec.build(hook)).collect()
}

/// Leaf whose outcome does not depend on the context
fn leaf<F>(
    hook: &Arc<dyn LifecycleHook>,
    name: &Option<String>,
    fallback: String,
    f: F,
) -> SharedStep
where
    F: Fn(&Context) -> Outcome + Send + Sync + 'static,
{
    let description = name.clone().unwrap_or(fallback);
    wrap_with_hook(description, hook.clone(), move |ctx: Context| {
        let outcome = f(&ctx);
        async move { outcome }
    })
}
