// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! [`Job`], the unit of work handed to a launcher.

use std::{
    fmt::Debug,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::Instant,
};

use crate::{Error, cell::Cell, telemetry};

trait Task: Send {
    fn run(self: Box<Self>);

    fn abandon(self: Box<Self>);
}

struct Computation<T, F> {
    cell: Arc<Cell<T>>,
    func: F,
}

impl<T, F> Task for Computation<T, F>
where
    T: Send + Sync + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    fn run(self: Box<Self>) {
        let Self { cell, func } = *self;
        cell.start();

        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(func)).map_err(|payload| Error::panicked(payload.as_ref()));

        match &outcome {
            Ok(_) => telemetry::completed(started.elapsed(), "ok"),
            Err(error) => {
                telemetry::panicked(error.panic_message());
                telemetry::completed(started.elapsed(), "panicked");
            }
        }

        cell.complete(outcome);
    }

    fn abandon(self: Box<Self>) {
        telemetry::abandoned();
        self.cell.complete(Err(Error::abandoned()));
    }
}

/// A computation waiting to be run by a launcher.
///
/// Running the job executes the computation on the current thread and publishes its
/// outcome to every waiter of the associated [`Eventual`](crate::Eventual). A panic in
/// the computation is caught and published as an [`Error`].
///
/// Dropping a job without running it completes the eventual with an abandoned error,
/// so waiters never block on work that will not happen.
///
/// # Examples
///
/// ```rust,ignore
/// use forthwith::Launcher;
///
/// let launcher = Launcher::new_custom(|job| {
///     std::thread::spawn(move || job.run());
/// });
///
/// let eventual = launcher.spawn(|| 6 * 7);
/// assert_eq!(eventual.wait().copied().unwrap(), 42);
/// ```
#[must_use = "dropping a job abandons its computation"]
pub struct Job(Option<Box<dyn Task>>);

impl Job {
    pub(crate) fn new<T, F>(cell: Arc<Cell<T>>, func: F) -> Self
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        Self(Some(Box::new(Computation { cell, func })))
    }

    /// Runs the computation to completion on the current thread.
    pub fn run(mut self) {
        if let Some(task) = self.0.take() {
            task.run();
        }
    }
}

impl Drop for Job {
    fn drop(&mut self) {
        if let Some(task) = self.0.take() {
            task.abandon();
        }
    }
}

impl Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job").finish_non_exhaustive()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tracing_subscriber::util::SubscriberInitExt;

    use super::*;
    use crate::{State, testing::LogCapture};

    static_assertions::assert_impl_all!(Job: Send);

    #[test]
    fn run_completes_cell() {
        let cell = Arc::new(Cell::new());
        let job = Job::new(Arc::clone(&cell), || "value");

        assert_eq!(cell.state(), State::Pending);
        job.run();

        assert_eq!(cell.state(), State::Completed);
        assert_eq!(*cell.wait().as_ref().unwrap(), "value");
    }

    #[test]
    fn run_invokes_computation_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cell = Arc::new(Cell::new());
        let counter = Arc::clone(&calls);

        Job::new(Arc::clone(&cell), move || counter.fetch_add(1, Ordering::SeqCst)).run();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*cell.wait().as_ref().unwrap(), 0);
    }

    #[test]
    fn panic_is_captured() {
        let cell: Arc<Cell<u32>> = Arc::new(Cell::new());
        Job::new(Arc::clone(&cell), || panic!("worker exploded")).run();

        let error = cell.wait().as_ref().unwrap_err();
        assert!(error.is_panic());
        assert_eq!(error.panic_message(), Some("worker exploded"));
    }

    #[test]
    fn drop_abandons() {
        let cell: Arc<Cell<u32>> = Arc::new(Cell::new());
        drop(Job::new(Arc::clone(&cell), || 1));

        assert!(cell.wait().as_ref().unwrap_err().is_abandoned());
    }

    #[test]
    fn debug_is_opaque() {
        let cell: Arc<Cell<u32>> = Arc::new(Cell::new());
        let job = Job::new(cell, || 1);

        assert_eq!(format!("{job:?}"), "Job { .. }");
        job.run();
    }

    #[test]
    fn run_emits_log() {
        let log_capture = LogCapture::new();
        let _guard = log_capture.subscriber().set_default();

        Job::new(Arc::new(Cell::new()), || 1).run();

        log_capture.assert_contains("forthwith::telemetry");
        log_capture.assert_contains("eventual.duration");
        log_capture.assert_contains("eventual.outcome=\"ok\"");
    }

    #[test]
    fn panic_emits_log() {
        let log_capture = LogCapture::new();
        let _guard = log_capture.subscriber().set_default();

        Job::new(Arc::new(Cell::<u32>::new()), || panic!("logged panic")).run();

        log_capture.assert_contains("WARN");
        log_capture.assert_contains("logged panic");
        log_capture.assert_contains("eventual.outcome=\"panicked\"");
    }

    #[test]
    fn abandon_emits_log() {
        let log_capture = LogCapture::new();
        let _guard = log_capture.subscriber().set_default();

        drop(Job::new(Arc::new(Cell::<u32>::new()), || 1));

        log_capture.assert_contains("eventual.outcome=\"abandoned\"");
    }
}
