// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Eagerly launched computations whose result is memoized for any number of waiters.
//!
//! This crate provides [`Eventual`], a handle to a computation that starts running in the
//! background the moment the handle is created. Any number of callers can wait for the
//! computation, from any number of threads or async tasks, and all of them observe the
//! same result. The computation runs exactly once, no matter how often or by how many
//! callers it is awaited, and even if it is never awaited at all.
//!
//! # Quick Start
//!
//! ```rust
//! use forthwith::Eventual;
//!
//! let eventual = Eventual::spawn(|| {
//!     // Runs on a dedicated thread, starting right now.
//!     (1..=10).sum::<u32>()
//! });
//!
//! // Blocks until the computation completes.
//! assert_eq!(*eventual.wait().unwrap(), 55);
//!
//! // Returns the memoized result immediately.
//! assert_eq!(*eventual.wait().unwrap(), 55);
//! ```
//!
//! # Waiting
//!
//! - [`Eventual::wait`] blocks the current thread.
//! - [`Eventual::wait_timeout`] blocks for at most the given duration. Timing out does not
//!   stop the computation.
//! - [`Eventual::wait_async`] returns a future, and `&Eventual` can be awaited directly.
//! - [`Eventual::try_get`] peeks without blocking.
//!
//! Waiters never run the computation themselves and never see a partial result.
//!
//! # Failures
//!
//! The computation is opaque to this crate: if it can fail, make it return a `Result`.
//! A panic inside the computation is caught on the worker and every waiter receives an
//! [`Error`] describing it, instead of blocking forever. There is no cancellation, no
//! retry and no backoff; build those on top if needed.
//!
//! ```rust
//! use forthwith::Eventual;
//!
//! let lookup = Eventual::spawn(|| "42".parse::<u32>());
//!
//! match lookup.wait() {
//!     Ok(Ok(value)) => assert_eq!(*value, 42),
//!     Ok(Err(parse_error)) => panic!("computation failed: {parse_error}"),
//!     Err(error) => panic!("computation did not complete: {error}"),
//! }
//! ```
//!
//! # Where Computations Run
//!
//! By default each computation gets its own OS thread. A [`Launcher`] selects a different
//! place: named threads with custom stack sizes, Tokio's blocking pool, or any thread pool
//! through a closure that receives a [`Job`].
//!
//! # Coalescing Lookups
//!
//! [`EventualMap`] hands out one shared [`Eventual`] per key, so that concurrent identical
//! requests trigger a single computation:
//!
//! ```rust
//! use forthwith::EventualMap;
//!
//! let profiles: EventualMap<u64, String> = EventualMap::new();
//!
//! let a = profiles.get_or_spawn(7, || "profile #7".to_string());
//! let b = profiles.get_or_spawn(7, || "never computed".to_string());
//!
//! assert_eq!(a.wait().unwrap(), b.wait().unwrap());
//! ```
//!
//! # Features
//!
//! - `tokio`: Enables `Launcher::new_tokio`.
//! - `custom`: Enables `Launcher::new_custom`.
//! - `logs`: Emits `tracing` events when computations are spawned, complete, panic or
//!   are abandoned.

#![doc(html_logo_url = "https://media.githubusercontent.com/media/microsoft/oxidizer/refs/heads/main/crates/forthwith/logo.png")]
#![doc(html_favicon_url = "https://media.githubusercontent.com/media/microsoft/oxidizer/refs/heads/main/crates/forthwith/favicon.ico")]

mod cell;
mod error;
mod eventual;
mod job;
mod launcher;
mod map;
mod state;
mod telemetry;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use eventual::{Eventual, Wait};
pub use job::Job;
pub use launcher::{Launcher, ThreadOptions};
pub use map::EventualMap;
pub use state::State;
