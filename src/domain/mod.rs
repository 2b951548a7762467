//! Domain types for ctrlkit.
//!
//! This module contains the core data structures:
//! - Outcome: The retry signal produced by every step, and its merge rule
//! - Error: Leaf, aggregate, sentinel and cancellation errors
//! - Report: The driver's verdict on a reconcile invocation

pub mod error;
pub mod outcome;
pub mod report;

// Re-export commonly used types
pub use error::{AggregateError, CompositionError, ContextError, StepError};
pub use outcome::Outcome;
pub use report::{ReconcileReport, Verdict};
pub(crate) use report::saturating_millis;
