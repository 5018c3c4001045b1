// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Demonstrates a cache stampede absorbed by a `Loader`.
//!
//! Twenty readers miss the same cold key at once. One of them queries the slow backend and
//! fills the cache, the rest wait for that fill. A second wave of readers is served from the
//! cache without touching the backend at all.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use coalesce_cache::{Loader, ReadHeavyCache};

const READERS: usize = 20;

fn main() {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let loader: Loader<_, String, String, String> = Loader::new(ReadHeavyCache::new());
    let backend_queries = AtomicUsize::new(0);

    for wave in 1..=2 {
        println!("Wave {wave}: {READERS} readers request product:42...");
        let start = Instant::now();

        thread::scope(|s| {
            for _ in 0..READERS {
                let (loader, backend_queries) = (&loader, &backend_queries);
                s.spawn(move || {
                    let result = loader.get_or_fill("product:42".to_string(), || {
                        backend_queries.fetch_add(1, Ordering::SeqCst);

                        // Simulate a slow backend query
                        thread::sleep(Duration::from_millis(300));

                        Ok("Product(name: Widget, price: 9.99)".to_string())
                    });

                    if let Err(e) = result {
                        println!("  Read failed: {e}");
                    }
                });
            }
        });

        println!(
            "Wave {wave} done in {:?}; backend queried {} time(s) so far\n",
            start.elapsed(),
            backend_queries.load(Ordering::SeqCst)
        );
    }
}
