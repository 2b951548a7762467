//! Cancellable execution context with an optional deadline.
//!
//! A [`Context`] is cheap to clone and is handed to every step. Deriving a
//! child returns a [`CancelGuard`]; the child is cancelled when the guard is
//! dropped or [`CancelGuard::cancel`] is called. Cancelling a parent cancels
//! every context derived from it.

use std::future::Future;
use std::time::Duration;

use futures::future::{self, FutureExt};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::domain::ContextError;

/// Execution context passed to [`Step::run`](super::Step::run)
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    /// One receiver per cancellable ancestor, including this context.
    signals: Vec<watch::Receiver<bool>>,
}

/// Releases a derived [`Context`] when dropped
#[derive(Debug)]
pub struct CancelGuard {
    tx: watch::Sender<bool>,
}

impl CancelGuard {
    /// Cancel the derived context now
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.tx.send_replace(true);
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a child that can be cancelled independently of its parent
    pub fn with_cancel(&self) -> (Context, CancelGuard) {
        self.derive(self.deadline)
    }

    /// Derive a child whose deadline is `deadline` or the parent's, whichever
    /// comes first
    pub fn with_deadline(&self, deadline: Instant) -> (Context, CancelGuard) {
        let deadline = match self.deadline {
            Some(parent) if parent <= deadline => parent,
            _ => deadline,
        };
        self.derive(Some(deadline))
    }

    /// Derive a child that expires `timeout` from now
    pub fn with_timeout(&self, timeout: Duration) -> (Context, CancelGuard) {
        self.with_deadline(Instant::now() + timeout)
    }

    fn derive(&self, deadline: Option<Instant>) -> (Context, CancelGuard) {
        let (tx, rx) = watch::channel(false);
        let mut signals = self.signals.clone();
        signals.push(rx);
        (Context { deadline, signals }, CancelGuard { tx })
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, if there is one
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Why the context is done, or `None` while it is still live
    pub fn err(&self) -> Option<ContextError> {
        if matches!(self.deadline, Some(d) if d <= Instant::now()) {
            return Some(ContextError::DeadlineExceeded);
        }
        if self.signals.iter().any(|rx| *rx.borrow()) {
            return Some(ContextError::Canceled);
        }
        None
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Resolve once the context is cancelled or its deadline passes
    pub async fn done(&self) -> ContextError {
        if let Some(err) = self.err() {
            return err;
        }

        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => future::pending::<()>().await,
            }
        };

        let mut signals = self.signals.clone();
        let cancelled = async {
            if signals.is_empty() {
                return future::pending::<()>().await;
            }
            // A closed channel means the guard is gone, which also cancels.
            let waits = signals
                .iter_mut()
                .map(|rx| async move { rx.wait_for(|c| *c).await.map(|_| ()).unwrap_or(()) }.boxed());
            future::select_all(waits).await;
        };

        tokio::select! {
            _ = expired => ContextError::DeadlineExceeded,
            _ = cancelled => self.err().unwrap_or(ContextError::Canceled),
        }
    }

    /// Run `fut` unless the context finishes first
    pub async fn until_done<F: Future>(&self, fut: F) -> Result<F::Output, ContextError> {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            out = fut => Ok(out),
            err = self.done() => Err(err),
        }
    }

    /// Sleep for `duration`, waking early with an error if the context ends
    pub async fn sleep(&self, duration: Duration) -> Result<(), ContextError> {
        self.until_done(tokio::time::sleep(duration)).await
    }
}
