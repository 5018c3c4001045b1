// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Demonstrates using `Group` to collapse a burst of identical requests into one execution.
//!
//! Ten threads ask for the same user record at about the same time. Only one of them runs the
//! lookup, the rest wait for it and receive a copy of the result.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use coalesce::Group;

fn main() {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let group: Group<String, String, String> = Group::new();
    let execution_count = AtomicUsize::new(0);

    println!("Starting 10 concurrent requests for user:123...\n");

    thread::scope(|s| {
        for i in 1..=10 {
            let (group, counter) = (&group, &execution_count);
            s.spawn(move || {
                let start = Instant::now();

                let outcome = group.work("user:123".to_string(), || {
                    let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    println!("  [Request {i}] Running the lookup (execution #{count})");

                    // Simulate an expensive database query
                    thread::sleep(Duration::from_millis(500));

                    Ok("UserData(name: Alice, age: 30)".to_string())
                });

                let shared = outcome.is_shared();
                match outcome.into_result() {
                    Ok(user) => println!("  [Request {i}] Got {user} in {:?} (shared: {shared})", start.elapsed()),
                    Err(e) => println!("  [Request {i}] Failed: {e}"),
                }
            });

            // Stagger the requests slightly to see the deduplication in action
            thread::sleep(Duration::from_millis(10));
        }
    });

    let total_executions = execution_count.load(Ordering::SeqCst);
    println!("\nAll requests completed! The lookup ran {total_executions} time(s) for 10 requests.");
}
