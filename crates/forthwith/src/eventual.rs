// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! [`Eventual`], the handle to a running or finished computation.

use std::{
    fmt::Debug,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::{Duration, Instant},
};

use crate::{Error, Launcher, Result, State, cell::Cell};

/// A computation that is running, or has run, in the background.
///
/// The computation starts the moment the eventual is created and runs exactly once.
/// Any number of callers, on any number of threads, can then wait for it. Every one
/// of them observes the same result, and the result is borrowed from the eventual
/// so it never has to be cloned.
///
/// Cloning an `Eventual` is cheap and yields another handle to the same computation.
///
/// # Failures
///
/// The computation's own failures belong in `T`, for example by returning a
/// `Result<V, E>`. Waiting only fails if the computation panicked, never ran, or a
/// bounded wait expired; see [`Error`].
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use forthwith::Eventual;
///
/// let eventual = Eventual::spawn(|| {
///     std::thread::sleep(Duration::from_millis(10));
///     "expensive".to_string()
/// });
///
/// // Both calls see the same value; the closure ran once.
/// assert_eq!(eventual.wait().unwrap(), "expensive");
/// assert_eq!(eventual.wait().unwrap(), "expensive");
/// ```
pub struct Eventual<T> {
    cell: Arc<Cell<T>>,
}

impl<T> Eventual<T>
where
    T: Send + Sync + 'static,
{
    /// Starts `func` on a dedicated thread and returns a handle to its result.
    ///
    /// Equivalent to `Launcher::default().spawn(func)`. Use [`Launcher`] to run the
    /// computation elsewhere.
    pub fn spawn<F>(func: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        Launcher::default().spawn(func)
    }
}

impl<T> Eventual<T> {
    /// Creates an eventual that is already completed with `value`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use forthwith::Eventual;
    ///
    /// let eventual = Eventual::ready(3);
    /// assert!(eventual.is_completed());
    /// assert_eq!(eventual.try_get().unwrap().copied().unwrap(), 3);
    /// ```
    #[must_use]
    pub fn ready(value: T) -> Self {
        Self::from_cell(Arc::new(Cell::ready(value)))
    }

    pub(crate) const fn from_cell(cell: Arc<Cell<T>>) -> Self {
        Self { cell }
    }

    /// Blocks the current thread until the computation completes, then returns its result.
    ///
    /// Returns immediately if the computation has already completed. The computation is
    /// never executed by the caller, and repeated calls return the very same value.
    ///
    /// # Errors
    ///
    /// Returns an error if the computation panicked or was abandoned before it ran.
    pub fn wait(&self) -> Result<&T> {
        project(self.cell.wait())
    }

    /// Like [`Eventual::wait`], but gives up after `timeout`.
    ///
    /// Giving up only affects this caller. The computation keeps running and a later
    /// wait can still observe its result.
    ///
    /// # Errors
    ///
    /// Returns an error for which [`Error::is_timeout`] is `true` if the computation did not
    /// complete in time, or the same errors as [`Eventual::wait`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::time::Duration;
    ///
    /// use forthwith::Eventual;
    ///
    /// let eventual = Eventual::spawn(|| std::thread::sleep(Duration::from_millis(200)));
    ///
    /// let error = eventual.wait_timeout(Duration::from_millis(1)).unwrap_err();
    /// assert!(error.is_timeout());
    ///
    /// eventual.wait().unwrap();
    /// ```
    pub fn wait_timeout(&self, timeout: Duration) -> Result<&T> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.wait();
        };

        self.cell
            .wait_until(deadline)
            .map_or_else(|| Err(Error::timed_out(timeout)), project)
    }

    /// Returns the result if the computation has completed, without blocking.
    #[must_use]
    pub fn try_get(&self) -> Option<Result<&T>> {
        self.cell.get().map(project)
    }

    /// Returns a future that resolves once the computation completes.
    ///
    /// This is the asynchronous counterpart of [`Eventual::wait`] and carries the same
    /// guarantees. `&Eventual` also implements [`IntoFuture`], so it can be awaited directly.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use forthwith::Eventual;
    ///
    /// # futures::executor::block_on(async {
    /// let eventual = Eventual::spawn(|| 21 * 2);
    ///
    /// assert_eq!(*eventual.wait_async().await.unwrap(), 42);
    /// assert_eq!(*(&eventual).await.unwrap(), 42);
    /// # });
    /// ```
    pub fn wait_async(&self) -> Wait<'_, T> {
        Wait {
            cell: &self.cell,
            slot: None,
        }
    }

    /// Returns the current lifecycle stage of the computation.
    #[must_use]
    pub fn state(&self) -> State {
        self.cell.state()
    }

    /// Returns `true` once the computation has completed, successfully or not.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state().is_completed()
    }

    /// Returns `true` if both handles refer to the same computation.
    #[must_use]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.cell, &other.cell)
    }
}

fn project<T>(outcome: &Result<T>) -> Result<&T> {
    outcome.as_ref().map_err(Error::clone)
}

impl<T> Clone for Eventual<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> Debug for Eventual<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Eventual").field("state", &self.state()).finish_non_exhaustive()
    }
}

impl<'a, T> IntoFuture for &'a Eventual<T> {
    type Output = Result<&'a T>;
    type IntoFuture = Wait<'a, T>;

    fn into_future(self) -> Self::IntoFuture {
        self.wait_async()
    }
}

/// Future returned by [`Eventual::wait_async`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Wait<'a, T> {
    cell: &'a Cell<T>,
    // Waker slot in the cell, held while this future is pending.
    slot: Option<usize>,
}

impl<'a, T> Future for Wait<'a, T> {
    type Output = Result<&'a T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let cell = this.cell;
        cell.poll_wait(cx, &mut this.slot).map(project)
    }
}

impl<T> Drop for Wait<'_, T> {
    fn drop(&mut self) {
        self.cell.cancel_wait(&mut self.slot);
    }
}

impl<T> Debug for Wait<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wait").field("state", &self.cell.state()).finish_non_exhaustive()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Barrier,
            atomic::{AtomicUsize, Ordering},
        },
        task::{Wake, Waker},
        thread,
    };

    use super::*;

    struct NoopWaker;

    impl Wake for NoopWaker {
        fn wake(self: Arc<Self>) {}
    }

    static_assertions::assert_impl_all!(Eventual<String>: Send, Sync, Clone, Debug);
    static_assertions::assert_impl_all!(Wait<'static, String>: Send, Unpin);

    #[test]
    fn ready_skips_worker() {
        let eventual = Eventual::ready("value");

        assert_eq!(eventual.state(), State::Completed);
        assert_eq!(*eventual.wait().unwrap(), "value");
    }

    #[test]
    fn try_get_before_and_after() {
        let gate = Arc::new(Barrier::new(2));
        let worker_gate = Arc::clone(&gate);
        let eventual = Eventual::spawn(move || {
            worker_gate.wait();
            7
        });

        assert!(eventual.try_get().is_none());
        assert!(!eventual.is_completed());

        gate.wait();
        assert_eq!(*eventual.wait().unwrap(), 7);
        assert_eq!(*eventual.try_get().unwrap().unwrap(), 7);
    }

    #[test]
    fn state_reports_running() {
        let started = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));
        let (worker_started, worker_release) = (Arc::clone(&started), Arc::clone(&release));

        let eventual = Eventual::spawn(move || {
            worker_started.wait();
            worker_release.wait();
        });

        started.wait();
        assert_eq!(eventual.state(), State::Running);

        release.wait();
        eventual.wait().unwrap();
        assert_eq!(eventual.state(), State::Completed);
    }

    #[test]
    fn clones_share_computation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let eventual = Eventual::spawn(move || counter.fetch_add(1, Ordering::SeqCst));
        let clone = eventual.clone();

        assert!(Eventual::ptr_eq(&eventual, &clone));
        assert!(std::ptr::eq(eventual.wait().unwrap(), clone.wait().unwrap()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn distinct_eventuals_are_not_ptr_eq() {
        assert!(!Eventual::ptr_eq(&Eventual::ready(1), &Eventual::ready(1)));
    }

    #[test]
    fn wait_timeout_then_wait() {
        let release = Arc::new(Barrier::new(2));
        let worker_release = Arc::clone(&release);
        let eventual = Eventual::spawn(move || {
            worker_release.wait();
            "late"
        });

        let error = eventual.wait_timeout(Duration::from_millis(5)).unwrap_err();
        assert!(error.is_timeout());

        release.wait();
        assert_eq!(*eventual.wait_timeout(Duration::from_secs(10)).unwrap(), "late");
    }

    #[test]
    fn wait_timeout_with_huge_timeout() {
        let eventual = Eventual::spawn(|| 1);

        assert_eq!(*eventual.wait_timeout(Duration::MAX).unwrap(), 1);
    }

    #[test]
    fn dropped_wait_futures_release_wakers() {
        let release = Arc::new(Barrier::new(2));
        let worker_release = Arc::clone(&release);
        let eventual = Eventual::spawn(move || {
            worker_release.wait();
            "done"
        });

        for _ in 0..1000 {
            let waker = Waker::from(Arc::new(NoopWaker));
            let mut wait = eventual.wait_async();
            assert!(Pin::new(&mut wait).poll(&mut Context::from_waker(&waker)).is_pending());
        }
        assert_eq!(eventual.cell.registered_wakers(), 0);

        let mut wait = eventual.wait_async();
        assert!(Pin::new(&mut wait).poll(&mut Context::from_waker(Waker::noop())).is_pending());
        assert!(Pin::new(&mut wait).poll(&mut Context::from_waker(Waker::noop())).is_pending());
        assert_eq!(eventual.cell.registered_wakers(), 1);
        drop(wait);
        assert_eq!(eventual.cell.registered_wakers(), 0);

        release.wait();
        assert_eq!(*eventual.wait().unwrap(), "done");
    }

    #[test]
    fn debug_output() {
        let eventual = Eventual::ready(1);

        assert_eq!(format!("{eventual:?}"), "Eventual { state: Completed, .. }");
        assert_eq!(format!("{:?}", eventual.wait_async()), "Wait { state: Completed, .. }");
    }

    #[test]
    fn wait_from_many_threads() {
        let eventual = Eventual::spawn(|| thread::current().id());

        let observed: Vec<_> = (0..8)
            .map(|_| {
                let eventual = eventual.clone();
                thread::spawn(move || *eventual.wait().unwrap())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        assert!(observed.windows(2).all(|pair| pair[0] == pair[1]));
        assert_ne!(observed[0], thread::current().id());
    }
}
