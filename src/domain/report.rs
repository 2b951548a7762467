//! Verdicts and reports for a single reconcile invocation.
//!
//! A report records what the driver concluded after running a root step once.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::StepError;
use super::outcome::Outcome;

/// What the caller of a reconcile invocation should do next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Verdict {
    /// Nothing to do until external state changes
    Settled,

    /// Re-invoke right away
    RequeueNow,

    /// Re-invoke after the given delay
    RequeueAfter { after_ms: u64 },

    /// A step failed; the error is surfaced to the caller
    Failed {
        error: String,
        /// Individual causes when the error is an aggregate
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        causes: Vec<String>,
    },
}

impl Verdict {
    /// Interpret a root outcome.
    ///
    /// An error wins over any requeue request, and a requeue delay wins over
    /// an immediate requeue. The exit sentinel is not special-cased here:
    /// strip it with `ignore_exit` first.
    pub fn from_outcome(outcome: Outcome) -> Self {
        let requeue = outcome.requeue();
        let after = outcome.requeue_after_delay();

        if let Some(error) = outcome.into_error() {
            return Self::failed(&error);
        }

        match after {
            Some(after) => Self::RequeueAfter {
                after_ms: ceil_millis(after),
            },
            None if requeue => Self::RequeueNow,
            None => Self::Settled,
        }
    }

    fn failed(error: &StepError) -> Self {
        let causes = error
            .as_aggregate()
            .map(|agg| agg.iter().map(|e| e.to_string()).collect())
            .unwrap_or_default();

        let error = match error.as_aggregate() {
            Some(agg) => format!("{} error(s) occurred", agg.len()),
            None => error.to_string(),
        };

        Self::Failed { error, causes }
    }

    /// Delay before the next invocation, if one was requested
    pub fn requeue_delay(&self) -> Option<Duration> {
        match self {
            Self::RequeueNow => Some(Duration::ZERO),
            Self::RequeueAfter { after_ms } => Some(Duration::from_millis(*after_ms)),
            Self::Settled | Self::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Settled => write!(f, "settled"),
            Self::RequeueNow => write!(f, "requeue now"),
            Self::RequeueAfter { after_ms } => write!(f, "requeue after {}ms", after_ms),
            Self::Failed { error, .. } => write!(f, "failed: {}", error),
        }
    }
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`
pub(crate) fn saturating_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Milliseconds rounded up, so a sub-millisecond delay stays a delay
fn ceil_millis(d: Duration) -> u64 {
    u64::try_from(d.as_nanos().div_ceil(1_000_000))
        .unwrap_or(u64::MAX)
        .max(1)
}

/// Record of one reconcile invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Unique identifier for this invocation
    pub id: Uuid,

    /// Description of the root step that was run
    pub step: String,

    /// When the invocation started
    pub started_at: DateTime<Utc>,

    /// When the invocation finished
    pub completed_at: Option<DateTime<Utc>>,

    /// Wall time of the root step in milliseconds
    pub duration_ms: u64,

    /// Final interpretation of the root outcome
    pub verdict: Verdict,
}

impl ReconcileReport {
    /// Start a report for the given root step
    pub fn new(step: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            step,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: 0,
            verdict: Verdict::Settled,
        }
    }

    /// Seal the report with the verdict
    pub fn complete(mut self, verdict: Verdict, duration_ms: u64) -> Self {
        self.verdict = verdict;
        self.duration_ms = duration_ms;
        self.completed_at = Some(Utc::now());
        self
    }
}
