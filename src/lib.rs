//! ctrlkit - Composable reconciliation steps for control loops
//!
//! A small algebra for building reconcile logic out of steps. Each step
//! inspects some external state and reports an [`Outcome`]: whether the loop
//! should run again (now or after a delay) and whether anything failed.
//! Combinators compose steps with fixed ordering, concurrency and merge
//! rules, so the final outcome of a tree does not depend on how deeply it is
//! nested.
//!
//! # Architecture
//!
//! - Leaves enter through [`wrap`]; everything else is composition
//! - [`sequential`] stops at the first step that needs requeue
//! - [`join`], [`join_ordered`] and [`join_in_parallel`] run everything and
//!   merge the outcomes
//! - [`when`], [`timeout`], [`parallel`] and [`nop`] modify single steps
//! - [`exit`] aborts a workflow early; [`ignore_exit`] keeps that from being
//!   reported as a failure
//!
//! # Modules
//!
//! - `core`: Context, the Step trait, combinators and hooks
//! - `domain`: Outcome, errors and reconcile reports
//! - `driver`: Single-invocation reconcile driver
//! - `workflow`: YAML workflow definitions for the CLI
//! - `config`: Driver configuration
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Run a workflow once
//! ctrlkit run workflows/rollout.yaml
//!
//! # Print its step tree
//! ctrlkit describe rollout
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod driver;
pub mod workflow;

// Re-export main types at crate root for convenience
pub use crate::core::{
    exit, exit_step, ignore_exit, join, join_in_parallel, join_ordered, nop, parallel,
    sequential, timeout, when, wrap, wrap_with_hook, CancelGuard, Context, EmptyHook,
    LifecycleHook, SharedStep, Step, TracingHook,
};
pub use config::ReconcilerConfig;
pub use domain::{
    AggregateError, CompositionError, ContextError, Outcome, ReconcileReport, StepError, Verdict,
};
pub use driver::Reconciler;
pub use workflow::{StepSpec, Workflow};
