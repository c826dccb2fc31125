// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{any::Any, fmt, sync::Arc, time::Duration};

/// The result type returned by the waiting operations of [`Eventual`](crate::Eventual).
pub type Result<T> = std::result::Result<T, Error>;

/// An error observed while waiting for an [`Eventual`](crate::Eventual).
///
/// Failures of the computation itself are expected to travel inside the result
/// type `T` (for example `T = Result<V, E>`). This error only describes what the
/// eventual could not deliver:
///
/// * The computation panicked. The panic is caught on the worker and converted into
///   an error, so every waiter observes it instead of blocking forever.
/// * The computation was abandoned before it ever ran, for example because the
///   worker thread could not be created or a custom launcher dropped the job.
/// * A bounded wait ran out of time. The computation keeps running in that case.
///
/// The error is cheap to clone, all waiters of one eventual share the same instance.
///
/// # Examples
///
/// ```
/// use forthwith::Eventual;
///
/// let eventual = Eventual::spawn(|| -> u32 { panic!("boom") });
/// let error = eventual.wait().unwrap_err();
///
/// assert!(error.is_panic());
/// assert_eq!(error.panic_message(), Some("boom"));
/// ```
#[derive(Clone)]
pub struct Error(Arc<ErrorKind>);

#[derive(Debug, thiserror::Error)]
enum ErrorKind {
    #[error("computation panicked: {message}")]
    Panicked { message: String },
    #[error("computation was abandoned before it could run")]
    Abandoned,
    #[error("timed out after {timeout:?} waiting for the computation")]
    TimedOut { timeout: Duration },
}

impl Error {
    fn from_kind(kind: ErrorKind) -> Self {
        Self(Arc::new(kind))
    }

    pub(crate) fn panicked(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "<non-string panic payload>".to_string()
        };

        Self::from_kind(ErrorKind::Panicked { message })
    }

    pub(crate) fn abandoned() -> Self {
        Self::from_kind(ErrorKind::Abandoned)
    }

    pub(crate) fn timed_out(timeout: Duration) -> Self {
        Self::from_kind(ErrorKind::TimedOut { timeout })
    }

    /// Returns `true` if the computation panicked.
    #[must_use]
    pub fn is_panic(&self) -> bool {
        matches!(*self.0, ErrorKind::Panicked { .. })
    }

    /// Returns `true` if the computation never ran.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        matches!(*self.0, ErrorKind::Abandoned)
    }

    /// Returns `true` if a bounded wait expired before the computation completed.
    ///
    /// Unlike the other kinds, a timeout is not a property of the eventual. Waiting
    /// again may still succeed.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(*self.0, ErrorKind::TimedOut { .. })
    }

    /// Returns the panic message if the computation panicked with a string payload.
    #[must_use]
    pub fn panic_message(&self) -> Option<&str> {
        match &*self.0 {
            ErrorKind::Panicked { message } => Some(message),
            _ => None,
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Error").field(&*self.0).finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for Error {}
