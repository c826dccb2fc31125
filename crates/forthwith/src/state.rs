// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::atomic::{AtomicU8, Ordering};

/// The lifecycle stage of an [`Eventual`](crate::Eventual).
///
/// Stages only move forward: `Pending` → `Running` → `Completed`. An eventual whose
/// worker finishes before it was ever observed as `Running` goes straight to `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// The worker has been scheduled but has not started the computation yet.
    Pending,
    /// The worker is executing the computation.
    Running,
    /// The outcome is fixed. This stage is terminal.
    Completed,
}

impl State {
    /// Returns `true` for the terminal [`State::Completed`] stage.
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }

    const fn to_u8(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Running => 1,
            Self::Completed => 2,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Pending,
            1 => Self::Running,
            _ => Self::Completed,
        }
    }
}

/// Forward-only atomic holder for a [`State`].
#[derive(Debug)]
pub(crate) struct AtomicState(AtomicU8);

impl AtomicState {
    pub(crate) const fn new(state: State) -> Self {
        Self(AtomicU8::new(state.to_u8()))
    }

    pub(crate) fn load(&self) -> State {
        State::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves to `state` unless the current stage is already at or past it.
    pub(crate) fn advance(&self, state: State) {
        self.0.fetch_max(state.to_u8(), Ordering::AcqRel);
    }
}
