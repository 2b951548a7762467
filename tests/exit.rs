//! Early Exit Integration Tests
//!
//! Tests for the exit sentinel travelling through step trees and being
//! stripped at the top.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ctrlkit::{
    exit, exit_step, ignore_exit, join, join_ordered, nop, sequential, when, wrap, Context,
    Outcome, Reconciler, SharedStep, Step, StepError, Verdict,
};

type Log = Arc<Mutex<Vec<String>>>;

fn logged(name: &str, log: &Log, outcome: fn() -> Outcome) -> SharedStep {
    let log = log.clone();
    let name = name.to_string();
    wrap(name.clone(), move |_ctx| {
        log.lock().unwrap().push(name.clone());
        let outcome = outcome();
        async move { outcome }
    })
}

#[tokio::test]
async fn test_exit_skips_remaining_logic() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let workflow = sequential(vec![
        logged("ObserveJobs", &log, Outcome::done),
        sequential(vec![logged("CheckSuspended", &log, exit), logged("RunJob", &log, Outcome::done)])
            .unwrap(),
        logged("CleanUp", &log, Outcome::done),
    ])
    .unwrap();

    let outcome = workflow.run(&Context::background()).await;
    assert!(outcome.error().unwrap().is_exit());

    let outcome = ignore_exit(outcome);
    assert!(outcome.is_ok());
    assert!(!outcome.needs_requeue());
    assert_eq!(*log.lock().unwrap(), vec!["ObserveJobs", "CheckSuspended"]);
}

#[tokio::test]
async fn test_exit_keeps_requeue_signal() {
    let step = wrap("ExitLater", |_ctx| async {
        exit().with_requeue_after(Duration::from_secs(30))
    });

    let outcome = ignore_exit(step.run(&Context::background()).await);
    assert!(outcome.is_ok());
    assert_eq!(outcome.requeue_after_delay(), Some(Duration::from_secs(30)));
}

#[tokio::test]
async fn test_exit_inside_join_is_still_reported() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let step = join(vec![
        logged("A", &log, exit),
        logged("B", &log, Outcome::done),
    ])
    .unwrap();

    let outcome = ignore_exit(step.run(&Context::background()).await);

    // Merged into an aggregate, so the top level no longer is the sentinel.
    let agg = outcome.error().and_then(StepError::as_aggregate).unwrap();
    assert_eq!(agg.len(), 1);
    assert!(agg.contains_exit());
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_message_lookalike_is_not_sentinel() {
    let step = wrap("Liar", |_ctx| async { Outcome::failed(anyhow::anyhow!("exit")) });
    let outcome = ignore_exit(step.run(&Context::background()).await);
    assert!(outcome.error().is_some());
}

#[tokio::test]
async fn test_driver_settles_after_exit() {
    let suspended = true;
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let root = join_ordered(vec![
        logged("UpdateStatus", &log, Outcome::done),
        sequential(vec![when(suspended, exit_step()), logged("RunNextJob", &log, Outcome::done)])
            .unwrap(),
    ])
    .unwrap();

    // join_ordered merges the exit into an aggregate: the driver reports it.
    let report = Reconciler::default().reconcile(&root).await;
    assert!(report.verdict.is_failed());

    // Exiting from the top-level sequence instead is silent.
    let root = sequential(vec![
        logged("UpdateStatus", &log, Outcome::done),
        when(suspended, exit_step()),
        logged("RunNextJob", &log, Outcome::done),
    ])
    .unwrap();
    let report = Reconciler::default().reconcile(&root).await;
    assert_eq!(report.verdict, Verdict::Settled);

    let calls = log.lock().unwrap().clone();
    assert_eq!(calls, vec!["UpdateStatus", "UpdateStatus"]);
}

#[tokio::test]
async fn test_when_false_drops_exit() {
    let root = sequential(vec![when(false, exit_step()), nop()]).unwrap();
    let outcome = root.run(&Context::background()).await;
    assert!(outcome.is_ok());
}
