//! The retry signal reported by every step, and the rule for merging signals.

use std::time::Duration;

use super::error::{AggregateError, StepError};

/// Result of running a step once.
///
/// `requeue_after` is never `Some(Duration::ZERO)`: constructors treat a zero
/// delay as "no delay requested".
#[derive(Debug, Default)]
pub struct Outcome {
    requeue: bool,
    requeue_after: Option<Duration>,
    error: Option<StepError>,
}

impl Outcome {
    /// The empty outcome: nothing to retry, nothing failed.
    pub fn done() -> Self {
        Self::default()
    }

    /// Ask for the loop to run again right away.
    pub fn requeue_now() -> Self {
        Self {
            requeue: true,
            ..Self::default()
        }
    }

    /// Ask for the loop to run again after `after`.
    pub fn requeue_after(after: Duration) -> Self {
        Self::default().with_requeue_after(after)
    }

    /// An empty signal paired with `error`.
    pub fn failed(error: impl Into<StepError>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn with_requeue(mut self, requeue: bool) -> Self {
        self.requeue = requeue;
        self
    }

    pub fn with_requeue_after(mut self, after: Duration) -> Self {
        self.requeue_after = (!after.is_zero()).then_some(after);
        self
    }

    pub fn with_error(mut self, error: impl Into<StepError>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn requeue(&self) -> bool {
        self.requeue
    }

    pub fn requeue_after_delay(&self) -> Option<Duration> {
        self.requeue_after
    }

    pub fn error(&self) -> Option<&StepError> {
        self.error.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Remove and return the error, leaving the requeue signal in place.
    pub fn take_error(&mut self) -> Option<StepError> {
        self.error.take()
    }

    pub fn into_error(self) -> Option<StepError> {
        self.error
    }

    /// True when the outcome failed or asks for another run.
    pub fn needs_requeue(&self) -> bool {
        self.error.is_some() || self.requeue || self.requeue_after.is_some()
    }

    /// Fold `next` into this outcome.
    ///
    /// Errors are appended to an aggregate, `requeue` is OR-ed, and the
    /// soonest `requeue_after` wins. Fold order does not change the signal.
    pub fn merge(mut self, next: Outcome) -> Outcome {
        let current = match self.error.take() {
            None => None,
            Some(StepError::Aggregate(agg)) => Some(agg),
            Some(other) => Some(AggregateError::from(other)),
        };

        self.error = match (current, next.error) {
            (None, None) => None,
            (Some(agg), None) => Some(StepError::Aggregate(agg)),
            (current, Some(error)) => {
                let mut agg = current.unwrap_or_default();
                agg.push(error);
                Some(StepError::Aggregate(agg))
            }
        };

        if next.requeue {
            self.requeue = true;
        }

        if let Some(after) = next.requeue_after {
            match self.requeue_after {
                Some(current) if current <= after => {}
                _ => self.requeue_after = Some(after),
            }
        }

        self
    }

    /// Merge every outcome, starting from the empty one.
    pub fn merge_all(outcomes: impl IntoIterator<Item = Outcome>) -> Outcome {
        outcomes.into_iter().fold(Outcome::done(), Outcome::merge)
    }
}
