//! Single-invocation reconcile driver.
//!
//! Gives the root step an ambient deadline, runs it once, strips the exit
//! sentinel and interprets what is left. Re-invoking later is up to the
//! caller; the verdict only says when.

use std::time::Instant;

use tracing::{error, info, instrument};

use crate::config::ReconcilerConfig;
use crate::core::{ignore_exit, Context, SharedStep};
use crate::domain::{saturating_millis, Outcome, ReconcileReport, Verdict};

/// Runs step trees under the configured reconcile deadline
pub struct Reconciler {
    config: ReconcilerConfig,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(ReconcilerConfig::default())
    }
}

impl Reconciler {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Run `root` once under `parent` plus the reconcile deadline.
    ///
    /// The outcome is returned with the exit sentinel already stripped, so
    /// callers that need to inspect individual errors can do so.
    pub async fn run_once(&self, parent: &Context, root: &SharedStep) -> Outcome {
        let (ctx, _guard) = parent.with_timeout(self.config.reconcile_timeout());
        ignore_exit(root.run(&ctx).await)
    }

    /// Reconcile from a background context
    pub async fn reconcile(&self, root: &SharedStep) -> ReconcileReport {
        self.reconcile_in(&Context::background(), root).await
    }

    /// Reconcile under a caller-supplied context
    #[instrument(skip_all, fields(step = %root.description()))]
    pub async fn reconcile_in(&self, parent: &Context, root: &SharedStep) -> ReconcileReport {
        let report = ReconcileReport::new(root.description());
        info!(id = %report.id, timeout_ms = self.config.reconcile_timeout_ms, "Reconcile started");

        let start = Instant::now();
        let outcome = self.run_once(parent, root).await;
        let duration_ms = saturating_millis(start.elapsed());

        let verdict = Verdict::from_outcome(outcome);
        match &verdict {
            Verdict::Failed { error, causes } => {
                error!(id = %report.id, duration_ms, %error, ?causes, "Reconcile failed");
            }
            other => {
                info!(id = %report.id, duration_ms, verdict = %other, "Reconcile finished");
            }
        }

        report.complete(verdict, duration_ms)
    }
}
