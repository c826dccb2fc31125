// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! [`Launcher`] for choosing where computations run.

use std::{sync::Arc, thread};

use crate::{Eventual, Job, cell::Cell, telemetry};

/// Decides where the worker of an [`Eventual`] runs.
///
/// Every launcher starts the computation immediately: [`Launcher::spawn`] schedules
/// the worker before it returns and never blocks on the computation itself.
///
/// # Examples
///
/// A dedicated, named OS thread per computation:
///
/// ```rust
/// use forthwith::{Launcher, ThreadOptions};
///
/// let launcher = Launcher::thread_with(ThreadOptions::new().name("lookup"));
/// let eventual = launcher.spawn(|| std::thread::current().name().map(str::to_owned));
///
/// assert_eq!(eventual.wait().unwrap().as_deref(), Some("lookup"));
/// ```
///
/// ## Tokio
///
/// ```rust,ignore
/// use forthwith::Launcher;
///
/// # #[tokio::main]
/// # async fn main() {
/// let launcher = Launcher::new_tokio();
/// let eventual = launcher.spawn(|| 1 + 1);
/// assert_eq!(*eventual.wait_async().await.unwrap(), 2);
/// # }
/// ```
///
/// ## Custom Thread Pool
///
/// ```rust,ignore
/// use forthwith::Launcher;
///
/// let launcher = Launcher::new_custom(|job| {
///     std::thread::spawn(move || job.run());
/// });
/// ```
#[derive(Debug, Clone, Default)]
pub struct Launcher(LauncherKind);

#[derive(Debug, Clone)]
enum LauncherKind {
    Thread(ThreadOptions),
    #[cfg(feature = "tokio")]
    Tokio(::tokio::runtime::Handle),
    #[cfg(feature = "custom")]
    Custom(CustomLauncher),
}

impl Default for LauncherKind {
    fn default() -> Self {
        Self::Thread(ThreadOptions::default())
    }
}

/// Options for the threads created by [`Launcher::thread_with`].
#[derive(Debug, Clone, Default)]
pub struct ThreadOptions {
    name: Option<String>,
    stack_size: Option<usize>,
}

impl ThreadOptions {
    /// Creates options for unnamed threads with the platform's default stack size.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the worker threads.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the stack size of the worker threads, in bytes.
    #[must_use]
    pub fn stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    fn builder(&self) -> thread::Builder {
        let mut builder = thread::Builder::new();
        if let Some(name) = &self.name {
            builder = builder.name(name.clone());
        }
        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }
        builder
    }
}

#[cfg(feature = "custom")]
type LaunchFn = dyn Fn(Job) + Send + Sync;

#[cfg(feature = "custom")]
#[derive(Clone)]
struct CustomLauncher(Arc<LaunchFn>);

#[cfg(feature = "custom")]
impl std::fmt::Debug for CustomLauncher {
    #[cfg_attr(test, mutants::skip)] // Debug output is not an API contract.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomLauncher").finish_non_exhaustive()
    }
}

impl Launcher {
    /// Creates a launcher that runs each computation on its own OS thread.
    ///
    /// This is the launcher used by [`Eventual::spawn`].
    #[must_use]
    pub fn thread() -> Self {
        Self::default()
    }

    /// Creates a launcher that runs each computation on its own OS thread built with `options`.
    #[must_use]
    pub fn thread_with(options: ThreadOptions) -> Self {
        Self(LauncherKind::Thread(options))
    }

    /// Creates a launcher that runs computations on the blocking thread pool of the
    /// current Tokio runtime.
    ///
    /// The runtime handle is captured here, so the launcher can later be used from
    /// threads outside the runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    #[cfg(feature = "tokio")]
    #[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
    pub fn new_tokio() -> Self {
        Self(LauncherKind::Tokio(::tokio::runtime::Handle::current()))
    }

    /// Creates a launcher from a closure that is responsible for running each [`Job`].
    ///
    /// The closure should hand the job to some other thread and return promptly. If it
    /// drops the job instead, the eventual completes with an abandoned error.
    ///
    /// The closure is called from [`Launcher::spawn`], so running the job inline makes
    /// `spawn` block until the computation finishes, and a panic in the closure unwinds
    /// out of `spawn` after the job has been abandoned.
    #[cfg(feature = "custom")]
    #[cfg_attr(docsrs, doc(cfg(feature = "custom")))]
    pub fn new_custom<F>(launch: F) -> Self
    where
        F: Fn(Job) + Send + Sync + 'static,
    {
        Self(LauncherKind::Custom(CustomLauncher(Arc::new(launch))))
    }

    /// Starts `func` in the background and returns a handle to its eventual result.
    ///
    /// With the thread and Tokio launchers this never blocks and never fails. If the
    /// worker cannot be started, waiters observe an abandoned [`Error`](crate::Error).
    /// A custom launcher blocks or panics only if its closure does; see
    /// `Launcher::new_custom`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use forthwith::Launcher;
    ///
    /// let eventual = Launcher::thread().spawn(|| "hello".len());
    /// assert_eq!(*eventual.wait().unwrap(), 5);
    /// ```
    pub fn spawn<T, F>(&self, func: F) -> Eventual<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let cell = Arc::new(Cell::new());
        let job = Job::new(Arc::clone(&cell), func);

        telemetry::spawned(self.kind_name());
        self.launch(job);

        Eventual::from_cell(cell)
    }

    fn launch(&self, job: Job) {
        match &self.0 {
            LauncherKind::Thread(options) => {
                // On failure the closure, and with it the job, has already been dropped.
                if let Err(error) = options.builder().spawn(move || job.run()) {
                    telemetry::launch_failed(&error);
                }
            }
            #[cfg(feature = "tokio")]
            LauncherKind::Tokio(handle) => {
                drop(handle.spawn_blocking(move || job.run()));
            }
            #[cfg(feature = "custom")]
            LauncherKind::Custom(custom) => (custom.0)(job),
        }
    }

    fn kind_name(&self) -> &'static str {
        match &self.0 {
            LauncherKind::Thread(_) => "thread",
            #[cfg(feature = "tokio")]
            LauncherKind::Tokio(_) => "tokio",
            #[cfg(feature = "custom")]
            LauncherKind::Custom(_) => "custom",
        }
    }
}
