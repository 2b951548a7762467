//! The step algebra.
//!
//! This module contains:
//! - Context: Cancellable, deadline-bearing execution context
//! - Step: The capability every leaf and combinator implements
//! - Hook: Lifecycle hooks around leaf execution
//! - Combinators: sequential, join, join_ordered, join_in_parallel
//! - Modifiers: when, timeout, parallel, nop
//! - Exit: Early-exit sentinel helpers

pub mod context;
pub mod exit;
pub mod hook;
pub mod join;
pub mod modifiers;
pub mod parallel;
pub mod sequential;
pub mod step;

// Re-export commonly used types
pub use context::{CancelGuard, Context};
pub use exit::{exit, exit_step, ignore_exit};
pub use hook::{EmptyHook, LifecycleHook, TracingHook};
pub use join::{join, join_ordered};
pub use modifiers::{nop, timeout, when, Nop};
pub use parallel::{join_in_parallel, parallel};
pub use sequential::sequential;
pub use step::{wrap, wrap_with_hook, SharedStep, Step, WrapStep};
