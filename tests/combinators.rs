//! Combinator Integration Tests
//!
//! Ordering, short-circuit and merge behavior of composed step trees.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ctrlkit::{
    join, join_in_parallel, join_ordered, nop, sequential, when, wrap, Context, Outcome,
    SharedStep, Step, StepError,
};

/// Step that records its name and returns a fresh copy of a fixed signal
fn scripted(
    name: &'static str,
    log: &Arc<Mutex<Vec<&'static str>>>,
    make: fn() -> Outcome,
) -> SharedStep {
    let log = log.clone();
    wrap(name, move |_ctx| {
        let log = log.clone();
        async move {
            log.lock().unwrap().push(name);
            make()
        }
    })
}

fn empty() -> Outcome {
    Outcome::done()
}

fn requeue() -> Outcome {
    Outcome::requeue_now()
}

fn failed_e1() -> Outcome {
    Outcome::failed(anyhow::anyhow!("e1"))
}

fn after_5s() -> Outcome {
    Outcome::requeue_after(Duration::from_secs(5))
}

fn after_2s() -> Outcome {
    Outcome::requeue_after(Duration::from_secs(2))
}

/// (error count, requeue, requeue_after)
fn signal(outcome: &Outcome) -> (usize, bool, Option<Duration>) {
    let errors = match outcome.error() {
        Some(StepError::Aggregate(agg)) => agg.len(),
        Some(_) => 1,
        None => 0,
    };
    (errors, outcome.requeue(), outcome.requeue_after_delay())
}

#[tokio::test]
async fn test_sequential_scenario() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let step = sequential(vec![
        scripted("A", &log, empty),
        scripted("B", &log, requeue),
        scripted("C", &log, empty),
    ])
    .unwrap();

    let outcome = step.run(&Context::background()).await;

    assert_eq!(signal(&outcome), (0, true, None));
    assert_eq!(*log.lock().unwrap(), vec!["A", "B"]);
}

#[tokio::test]
async fn test_sequential_stops_at_every_position() {
    for stop_at in 0..4 {
        let calls = Arc::new(AtomicUsize::new(0));
        let steps: Vec<SharedStep> = (0..4)
            .map(|i| {
                let calls = calls.clone();
                wrap(format!("S{}", i), move |_ctx| {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        if i == stop_at {
                            Outcome::failed(anyhow::anyhow!("stop"))
                        } else {
                            Outcome::done()
                        }
                    }
                })
            })
            .collect();

        let outcome = sequential(steps).unwrap().run(&Context::background()).await;

        assert_eq!(calls.load(Ordering::SeqCst), stop_at + 1);
        // The failing step's outcome is passed through, not merged.
        assert!(outcome.error().unwrap().as_aggregate().is_none());
    }
}

#[tokio::test]
async fn test_join_scenario() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let step = join(vec![
        scripted("A", &log, failed_e1),
        scripted("B", &log, after_5s),
        scripted("C", &log, after_2s),
    ])
    .unwrap();

    let outcome = step.run(&Context::background()).await;

    assert_eq!(signal(&outcome), (1, false, Some(Duration::from_secs(2))));
    let agg = outcome.error().and_then(StepError::as_aggregate).unwrap();
    assert_eq!(agg.errors()[0].to_string(), "e1");
    assert_eq!(log.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_join_is_order_independent() {
    let makers: [(&'static str, fn() -> Outcome); 4] = [
        ("A", failed_e1),
        ("B", after_5s),
        ("C", after_2s),
        ("D", requeue),
    ];
    let permutations: [[usize; 4]; 6] = [
        [0, 1, 2, 3],
        [3, 2, 1, 0],
        [1, 0, 3, 2],
        [2, 3, 0, 1],
        [0, 2, 1, 3],
        [3, 1, 2, 0],
    ];

    let log = Arc::new(Mutex::new(Vec::new()));
    let mut signals = Vec::new();
    for perm in permutations {
        let steps: Vec<SharedStep> = perm
            .iter()
            .map(|&i| scripted(makers[i].0, &log, makers[i].1))
            .collect();

        for step in [
            join_ordered(steps.clone()).unwrap(),
            join(steps.clone()).unwrap(),
            join_in_parallel(steps).unwrap(),
        ] {
            signals.push(signal(&step.run(&Context::background()).await));
        }
    }

    let expected = (1, true, Some(Duration::from_secs(2)));
    assert!(signals.iter().all(|s| *s == expected), "{:?}", signals);
}

#[tokio::test]
async fn test_join_in_parallel_is_bounded_by_slowest_branch() {
    let sleeper = |name: &str, ms: u64| {
        wrap(name, move |_ctx| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Outcome::done()
        })
    };
    let step = join_in_parallel(vec![
        sleeper("A", 100),
        sleeper("B", 200),
        sleeper("C", 50),
    ])
    .unwrap();

    let start = Instant::now();
    let outcome = step.run(&Context::background()).await;
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(340), "took {:?}", elapsed);
    assert_eq!(signal(&outcome), (0, false, None));
}

#[tokio::test]
async fn test_failing_branch_does_not_cancel_siblings() {
    let finished = Arc::new(AtomicUsize::new(0));
    let slow = {
        let finished = finished.clone();
        wrap("Slow", move |ctx: Context| {
            let finished = finished.clone();
            async move {
                if ctx.sleep(Duration::from_millis(50)).await.is_ok() {
                    finished.fetch_add(1, Ordering::SeqCst);
                }
                Outcome::done()
            }
        })
    };
    let fast_fail = wrap("FastFail", |_ctx| async { failed_e1() });

    let outcome = join_in_parallel(vec![fast_fail, slow])
        .unwrap()
        .run(&Context::background())
        .await;

    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert_eq!(signal(&outcome), (1, false, None));
}

#[tokio::test]
async fn test_nested_errors_are_flattened() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let inner = join_ordered(vec![
        scripted("A", &log, failed_e1),
        scripted("B", &log, failed_e1),
    ])
    .unwrap();
    let outer = join_ordered(vec![inner, scripted("C", &log, failed_e1), nop()]).unwrap();

    let outcome = outer.run(&Context::background()).await;
    assert_eq!(signal(&outcome).0, 3);
}

#[tokio::test]
async fn test_when_selects_at_assembly() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let step = join_ordered(vec![
        when(false, scripted("Skipped", &log, failed_e1)),
        when(true, scripted("Included", &log, after_2s)),
    ])
    .unwrap();

    assert_eq!(step.description(), "JoinOrdered(Nop, Included)");
    let outcome = step.run(&Context::background()).await;

    assert_eq!(signal(&outcome), (0, false, Some(Duration::from_secs(2))));
    assert_eq!(*log.lock().unwrap(), vec!["Included"]);
}

#[test]
fn test_empty_combinators_fail_at_construction() {
    assert!(sequential(Vec::new()).is_err());
    assert!(join(Vec::new()).is_err());
    assert!(join_ordered(Vec::new()).is_err());
    assert!(join_in_parallel(Vec::new()).is_err());
}
