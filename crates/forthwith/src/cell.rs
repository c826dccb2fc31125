// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{
    sync::OnceLock,
    task::{Context, Poll, Waker},
    time::Instant,
};

use parking_lot::{Condvar, Mutex};

use crate::{
    Result,
    state::{AtomicState, State},
};

/// Write-once slot shared between a worker and any number of waiters.
///
/// The outcome is published through the `OnceLock` before the waiter mutex is taken
/// by the completing worker. Waiters re-check the slot while holding that mutex, so a
/// completion can never slip in between a waiter's check and its sleep.
pub(crate) struct Cell<T> {
    outcome: OnceLock<Result<T>>,
    state: AtomicState,
    wakers: Mutex<Wakers>,
    signal: Condvar,
}

/// Wakers of pending async waiters, each held in a slot owned by one `Wait` future.
///
/// Freed slots are reused, so the registry never holds more wakers than there are
/// live futures polling the cell.
#[derive(Default)]
struct Wakers {
    slots: Vec<Option<Waker>>,
    free: Vec<usize>,
}

impl Wakers {
    /// Stores `waker` in `slot`, allocating a slot on first registration.
    fn register(&mut self, slot: &mut Option<usize>, waker: &Waker) {
        if let Some(existing) = (*slot).and_then(|key| self.slots.get_mut(key)).and_then(Option::as_mut) {
            if !existing.will_wake(waker) {
                existing.clone_from(waker);
            }
            return;
        }

        let key = match self.free.pop() {
            Some(key) => key,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        };

        if let Some(entry) = self.slots.get_mut(key) {
            *entry = Some(waker.clone());
        }
        *slot = Some(key);
    }

    fn deregister(&mut self, key: usize) {
        if self.slots.get_mut(key).and_then(Option::take).is_some() {
            self.free.push(key);
        }
    }

    fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn take_all(&mut self) -> Vec<Waker> {
        self.free.clear();
        std::mem::take(&mut self.slots).into_iter().flatten().collect()
    }
}

impl<T> Cell<T> {
    pub(crate) fn new() -> Self {
        Self {
            outcome: OnceLock::new(),
            state: AtomicState::new(State::Pending),
            wakers: Mutex::new(Wakers::default()),
            signal: Condvar::new(),
        }
    }

    pub(crate) fn ready(value: T) -> Self {
        Self {
            outcome: OnceLock::from(Ok(value)),
            state: AtomicState::new(State::Completed),
            wakers: Mutex::new(Wakers::default()),
            signal: Condvar::new(),
        }
    }

    pub(crate) fn state(&self) -> State {
        // The outcome is published before the stored stage catches up.
        if self.outcome.get().is_some() {
            State::Completed
        } else {
            self.state.load()
        }
    }

    pub(crate) fn start(&self) {
        self.state.advance(State::Running);
    }

    /// Stores the outcome and releases every waiter.
    pub(crate) fn complete(&self, outcome: Result<T>) {
        if self.outcome.set(outcome).is_err() {
            // Already completed.
            return;
        }

        let wakers = {
            let mut wakers = self.wakers.lock();
            self.state.advance(State::Completed);
            self.signal.notify_all();
            wakers.take_all()
        };

        for waker in wakers {
            waker.wake();
        }
    }

    pub(crate) fn get(&self) -> Option<&Result<T>> {
        self.outcome.get()
    }

    pub(crate) fn wait(&self) -> &Result<T> {
        if let Some(outcome) = self.outcome.get() {
            return outcome;
        }

        let mut wakers = self.wakers.lock();
        loop {
            if let Some(outcome) = self.outcome.get() {
                return outcome;
            }

            self.signal.wait(&mut wakers);
        }
    }

    /// Like [`Cell::wait`] but gives up at `deadline`, returning `None`.
    pub(crate) fn wait_until(&self, deadline: Instant) -> Option<&Result<T>> {
        if let Some(outcome) = self.outcome.get() {
            return Some(outcome);
        }

        let mut wakers = self.wakers.lock();
        loop {
            if let Some(outcome) = self.outcome.get() {
                return Some(outcome);
            }

            if self.signal.wait_until(&mut wakers, deadline).timed_out() {
                return self.outcome.get();
            }
        }
    }

    /// Polls for the outcome, keeping the caller's waker in `slot` while pending.
    ///
    /// The caller must hand `slot` back through [`Cell::cancel_wait`] when it stops polling.
    pub(crate) fn poll_wait(&self, cx: &Context<'_>, slot: &mut Option<usize>) -> Poll<&Result<T>> {
        if let Some(outcome) = self.outcome.get() {
            return Poll::Ready(outcome);
        }

        let mut wakers = self.wakers.lock();
        if let Some(outcome) = self.outcome.get() {
            return Poll::Ready(outcome);
        }

        wakers.register(slot, cx.waker());
        Poll::Pending
    }

    #[cfg(test)]
    pub(crate) fn registered_wakers(&self) -> usize {
        self.wakers.lock().len()
    }

    /// Releases a slot handed out by [`Cell::poll_wait`].
    pub(crate) fn cancel_wait(&self, slot: &mut Option<usize>) {
        if let Some(key) = slot.take() {
            self.wakers.lock().deregister(key);
        }
    }
}
