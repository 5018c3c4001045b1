// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(missing_docs, reason = "test code")]

//! Integration tests for `Group::work()`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use coalesce::{Error, Group};

/// How long callers past the start barrier get to queue on the running call.
///
/// Callers that have not attached by the time the producer is released start a second call,
/// so suppression tests assume none of them is descheduled for longer than this.
const SETTLE: Duration = Duration::from_millis(250);
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Waits for the call to be registered, lets the other callers queue on it, then opens `gate`.
fn release_when_queued<K, T, E>(group: &Group<K, T, E>, gate: mpsc::Sender<()>) {
    let deadline = Instant::now() + TEST_TIMEOUT;
    while group.in_flight() != 1 {
        assert!(Instant::now() < deadline, "the call was never registered");
        thread::sleep(Duration::from_millis(1));
    }

    thread::sleep(SETTLE);
    gate.send(()).unwrap();
}

#[test]
fn direct_call() {
    let group: Group<&str, String, String> = Group::new();
    let outcome = group.work("key", || Ok("bar".to_string()));
    assert!(!outcome.is_shared());
    assert_eq!(outcome.into_result(), Ok("bar".to_string()));
}

#[test]
fn direct_call_error() {
    let group: Group<&str, String, &str> = Group::new();
    let outcome = group.work("key", || Err("some error"));
    assert_eq!(outcome.into_result(), Err(Error::Producer("some error")));
}

#[test]
fn call_blocks_for_producer() {
    let group: Group<&str, String, ()> = Group::new();
    let begin = Instant::now();
    let outcome = group.work("key", || {
        thread::sleep(Duration::from_millis(100));
        Ok("bar".to_string())
    });
    assert_eq!(outcome.into_result(), Ok("bar".to_string()));
    assert!(begin.elapsed() >= Duration::from_millis(100));
}

#[test]
fn call_with_custom_key() {
    #[derive(Clone, PartialEq, Eq, Hash)]
    struct K(i32);

    let group: Group<K, String, ()> = Group::new();
    let outcome = group.work(K(1), || Ok("Result".to_string()));
    assert_eq!(outcome.into_result(), Ok("Result".to_string()));
}

#[test]
fn duplicate_suppression() {
    const CALLERS: usize = 100;

    let group: Group<&str, String, ()> = Group::new();
    let calls = AtomicUsize::new(0);
    let (release, gate) = mpsc::channel::<()>();
    let gate = parking_lot::Mutex::new(gate);
    let entered = Barrier::new(CALLERS + 1);

    let outcomes: Vec<_> = thread::scope(|s| {
        let (group, calls, gate, entered) = (&group, &calls, &gate, &entered);
        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                s.spawn(move || {
                    entered.wait();
                    group.work("key", || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        gate.lock().recv().unwrap();
                        Ok("bar".to_string())
                    })
                })
            })
            .collect();

        // Every caller is about to enter `work`.
        entered.wait();
        release_when_queued(group, release);

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcomes.iter().filter(|o| !o.is_shared()).count(), 1);
    for outcome in outcomes {
        assert_eq!(outcome.into_result(), Ok("bar".to_string()));
    }
}

#[test]
fn shared_error() {
    const CALLERS: usize = 10;

    let group: Group<&str, String, &str> = Group::new();
    let calls = AtomicUsize::new(0);
    let (release, gate) = mpsc::channel::<()>();
    let gate = parking_lot::Mutex::new(gate);
    let entered = Barrier::new(CALLERS + 1);

    thread::scope(|s| {
        for _ in 0..CALLERS {
            s.spawn(|| {
                entered.wait();
                let outcome = group.work("key", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    gate.lock().recv().map_err(|_closed| "gate closed")?;
                    Err("some error")
                });
                assert_eq!(outcome.into_result(), Err(Error::Producer("some error")));
            });
        }

        entered.wait();
        release_when_queued(&group, release);
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn retired_call_reruns_producer() {
    let group: Group<&str, &str, ()> = Group::new();

    assert_eq!(group.work("key", || Ok("first")).into_result(), Ok("first"));

    let second = group.work("key", || Ok("second"));
    assert!(!second.is_shared());
    assert_eq!(second.into_result(), Ok("second"));
}

#[test]
fn errors_are_not_retained() {
    let group: Group<&str, u32, &str> = Group::new();

    assert_eq!(group.work("key", || Err("down")).into_result(), Err(Error::Producer("down")));
    assert_eq!(group.work("key", || Ok(1)).into_result(), Ok(1));
}

#[test]
fn late_arrival_attaches_to_running_call() {
    let group: Group<&str, &str, ()> = Group::new();
    let (started_tx, started_rx) = mpsc::channel();

    thread::scope(|s| {
        let early = s.spawn(|| {
            group.work("key", || {
                started_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(100));
                Ok("early")
            })
        });

        started_rx.recv().unwrap();
        let late = group.work("key", || Ok("late"));
        assert!(late.is_shared());
        assert_eq!(late.into_result(), Ok("early"));

        assert!(!early.join().unwrap().is_shared());
    });
}

#[test]
fn distinct_keys_run_concurrently() {
    const KEYS: usize = 8;

    let group: Group<usize, usize, ()> = Group::new();
    let running = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);
    let all_started = Barrier::new(KEYS);

    thread::scope(|s| {
        for key in 0..KEYS {
            let (group, running, peak, all_started) = (&group, &running, &peak, &all_started);
            s.spawn(move || {
                let outcome = group.work(key, || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    all_started.wait();
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(key)
                });
                assert!(!outcome.is_shared());
                assert_eq!(outcome.into_result(), Ok(key));
            });
        }
    });

    assert_eq!(peak.load(Ordering::SeqCst), KEYS);
    assert_eq!(group.in_flight(), 0);
}

#[test]
fn retirement_race_sees_consistent_calls() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 500;

    let group: Arc<Group<u8, usize, ()>> = Arc::new(Group::new());
    let executions = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let group = Arc::clone(&group);
            let executions = Arc::clone(&executions);
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    let mut produced = None;
                    let outcome = group.work(0, || {
                        let id = executions.fetch_add(1, Ordering::SeqCst);
                        produced = Some(id);
                        Ok(id)
                    });
                    let (result, shared) = outcome.into_parts();
                    let seen = result.unwrap();
                    if shared {
                        // Attached to someone else's call: the value was fixed by an earlier execution.
                        assert_eq!(produced, None);
                        assert!(seen < executions.load(Ordering::SeqCst));
                    } else {
                        assert_eq!(produced, Some(seen));
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let executions = executions.load(Ordering::SeqCst);
    assert!(executions >= 1);
    assert!(executions <= THREADS * ROUNDS);
    assert_eq!(group.in_flight(), 0);
}

#[test]
fn debug_impl() {
    let group: Group<String, String, String> = Group::new();
    let debug_str = format!("{group:?}");
    assert!(debug_str.contains("Group"));
    assert!(debug_str.contains("in_flight: 0"));
    assert!(debug_str.contains("Synchronous"));
}
