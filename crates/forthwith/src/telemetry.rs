// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Lifecycle events, emitted through `tracing` when the `logs` feature is enabled.

use std::time::Duration;

#[cfg_attr(
    not(any(feature = "logs", test)),
    expect(unused_variables, reason = "unused when logs feature not used")
)]
pub(crate) fn spawned(launcher: &'static str) {
    #[cfg(any(feature = "logs", test))]
    tracing::event!(
        name: "forthwith.spawned",
        tracing::Level::DEBUG,
        launcher.kind = launcher,
    );
}

#[cfg_attr(
    not(any(feature = "logs", test)),
    expect(unused_variables, reason = "unused when logs feature not used")
)]
pub(crate) fn completed(duration: Duration, outcome: &'static str) {
    #[cfg(any(feature = "logs", test))]
    tracing::event!(
        name: "forthwith.completed",
        tracing::Level::DEBUG,
        eventual.duration = duration.as_secs_f32(),
        eventual.outcome = outcome,
    );
}

#[cfg_attr(
    not(any(feature = "logs", test)),
    expect(unused_variables, reason = "unused when logs feature not used")
)]
pub(crate) fn panicked(message: Option<&str>) {
    #[cfg(any(feature = "logs", test))]
    tracing::event!(
        name: "forthwith.panicked",
        tracing::Level::WARN,
        eventual.panic.message = message.unwrap_or_default(),
    );
}

pub(crate) fn abandoned() {
    #[cfg(any(feature = "logs", test))]
    tracing::event!(name: "forthwith.abandoned", tracing::Level::WARN, eventual.outcome = "abandoned");
}

#[cfg_attr(
    not(any(feature = "logs", test)),
    expect(unused_variables, reason = "unused when logs feature not used")
)]
pub(crate) fn launch_failed(error: &std::io::Error) {
    #[cfg(any(feature = "logs", test))]
    tracing::event!(
        name: "forthwith.launch_failed",
        tracing::Level::ERROR,
        error.message = %error,
    );
}
