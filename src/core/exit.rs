//! Early exit from a workflow without reporting a failure.
//!
//! A leaf returns [`exit`] to stop the enclosing `sequential` chain. The
//! sentinel then travels up like any other error until the driver strips it
//! with [`ignore_exit`]. Only the exact top-level sentinel is stripped: a
//! join that merged an exit with anything else still reports an aggregate.

use super::step::{wrap, SharedStep};
use crate::domain::{Outcome, StepError};

/// The empty outcome carrying the exit sentinel
pub fn exit() -> Outcome {
    Outcome::failed(StepError::Exit)
}

/// Clear the error if it is exactly the exit sentinel.
///
/// Requeue flags are kept. Any other error, including an aggregate that
/// contains the sentinel, is left untouched.
pub fn ignore_exit(mut outcome: Outcome) -> Outcome {
    if outcome.error().is_some_and(StepError::is_exit) {
        outcome.take_error();
    }
    outcome
}

/// Leaf step that always exits
pub fn exit_step() -> SharedStep {
    wrap("Exit", |_ctx| async { exit() })
}
