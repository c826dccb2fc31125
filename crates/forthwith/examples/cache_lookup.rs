// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Coalesces concurrent cache-miss lookups into a single backend query.
//!
//! Several request handlers ask for the same user at nearly the same time. The first one
//! starts the query, the others attach to the running computation, and later requests hit
//! the memoized result.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use forthwith::{EventualMap, Launcher, ThreadOptions};

#[derive(Debug, Clone)]
struct User {
    name: String,
    age: u32,
}

fn main() {
    let lookups: Arc<EventualMap<String, Result<User, String>>> =
        Arc::new(EventualMap::with_launcher(Launcher::thread_with(ThreadOptions::new().name("user-lookup"))));
    let queries = Arc::new(AtomicUsize::new(0));

    println!("Starting 5 concurrent requests for user:123...\n");

    let handlers: Vec<_> = (1..=5)
        .map(|request| {
            let lookups = Arc::clone(&lookups);
            let queries = Arc::clone(&queries);

            let handler = thread::spawn(move || {
                let start = Instant::now();

                let eventual = lookups.get_or_spawn("user:123".to_string(), move || {
                    let count = queries.fetch_add(1, Ordering::SeqCst) + 1;
                    println!("  [Request {request}] Querying the database... (query #{count})");

                    // Simulate an expensive database query.
                    thread::sleep(Duration::from_millis(500));

                    Ok(User {
                        name: "Alice".to_string(),
                        age: 30,
                    })
                });

                match eventual.wait() {
                    Ok(Ok(user)) => println!("  [Request {request}] Got {user:?} in {:?}", start.elapsed()),
                    Ok(Err(error)) => println!("  [Request {request}] Lookup failed: {error}"),
                    Err(error) => println!("  [Request {request}] Lookup did not complete: {error}"),
                }
            });

            // Stagger the requests slightly to see the coalescing in action.
            thread::sleep(Duration::from_millis(10));
            handler
        })
        .collect();

    for handler in handlers {
        handler.join().expect("request handler panicked");
    }

    let cached = lookups.get("user:123").expect("lookup should be memoized");
    let start = Instant::now();
    if let Ok(Ok(user)) = cached.wait() {
        println!("\nCached lookup returned {} ({}) in {:?}", user.name, user.age, start.elapsed());
    }

    let total = queries.load(Ordering::SeqCst);
    println!("All requests completed! The database was queried {total} time(s) for 5 requests.");
}
