//! Error taxonomy for step execution.
//!
//! Leaf errors are opaque (`anyhow::Error`). Combinators only ever add
//! [`AggregateError`]s on top of them. [`StepError::Exit`] is a control-flow
//! marker, not a failure.

use std::fmt;

use thiserror::Error;

/// Error carried by an [`Outcome`](super::Outcome).
#[derive(Debug, Error)]
pub enum StepError {
    /// Early-exit sentinel.
    ///
    /// Matched by variant, never by its message. A leaf error whose text
    /// happens to read "exit" is not the sentinel.
    #[error("exit")]
    Exit,

    /// The step observed a cancelled or expired [`Context`](crate::core::Context).
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Every error collected while merging child outcomes.
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    /// A step running on an isolated task panicked.
    #[error("step '{step}' panicked: {message}")]
    Panicked { step: String, message: String },

    /// Error returned by leaf logic.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StepError {
    /// Returns true only for the top-level exit sentinel.
    pub fn is_exit(&self) -> bool {
        matches!(self, Self::Exit)
    }

    /// Returns the cancellation cause if this is a context error.
    pub fn as_context(&self) -> Option<ContextError> {
        match self {
            Self::Context(e) => Some(*e),
            _ => None,
        }
    }

    /// Returns the aggregate if this error came out of a merge.
    pub fn as_aggregate(&self) -> Option<&AggregateError> {
        match self {
            Self::Aggregate(agg) => Some(agg),
            _ => None,
        }
    }
}

/// Why a [`Context`](crate::core::Context) is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Ordered collection of errors produced by merging outcomes.
///
/// Nested aggregates are flattened on insert, so the number of causes does
/// not depend on how a step tree was grouped.
#[derive(Debug, Default)]
pub struct AggregateError {
    errors: Vec<StepError>,
}

impl AggregateError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an error, flattening it if it is itself an aggregate.
    pub fn push(&mut self, error: StepError) {
        match error {
            StepError::Aggregate(nested) => self.errors.extend(nested.errors),
            other => self.errors.push(other),
        }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Individual causes in the order they were merged.
    pub fn errors(&self) -> &[StepError] {
        &self.errors
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepError> {
        self.errors.iter()
    }

    pub fn into_errors(self) -> Vec<StepError> {
        self.errors
    }

    /// Whether any cause is the exit sentinel.
    pub fn contains_exit(&self) -> bool {
        self.errors.iter().any(StepError::is_exit)
    }
}

impl From<StepError> for AggregateError {
    fn from(error: StepError) -> Self {
        let mut agg = Self::new();
        agg.push(error);
        agg
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.errors.len() == 1 { "error" } else { "errors" };
        writeln!(f, "{} {} occurred:", self.errors.len(), noun)?;
        for error in &self.errors {
            writeln!(f, "\t* {}", error)?;
        }
        writeln!(f)
    }
}

impl std::error::Error for AggregateError {}

/// Refusal to assemble a composite step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionError {
    #[error("{combinator} requires at least one step")]
    Empty { combinator: &'static str },
}
