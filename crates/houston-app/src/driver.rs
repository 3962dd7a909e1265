//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific I/O
//! implementations. Each frontend implements the trait to provide
//! platform-specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::{future::Future, ops::Sub, time::Duration};

use houston_core::{RetryToken, TransportCommand};

use crate::{App, AppEvent};

/// Abstracts I/O operations for the application runtime.
///
/// Implementations provide platform-specific I/O while the generic
/// [`Runtime`](crate::Runtime) handles orchestration logic. This ensures
/// the same orchestration code runs in the production TUI and in simulation.
///
/// # Implementations
///
/// - **TUI**: crossterm for terminal events, a radio task for BLE events
/// - **Simulation**: a scripted peripheral on a virtual clock
///
/// # Associated Types
///
/// - [`Error`](Driver::Error): Platform-specific error type
/// - [`Instant`](Driver::Instant): Time representation (real or virtual)
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in simulation.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Wait for the next input event.
    ///
    /// Returns `None` once the event source is exhausted; the runtime then
    /// stops.
    fn poll_event(&mut self) -> impl Future<Output = Result<Option<AppEvent>, Self::Error>> + Send;

    /// Forward a command to the radio.
    ///
    /// Commands are fire-and-forget; outcomes arrive later through
    /// [`Driver::poll_event`].
    ///
    /// # Errors
    ///
    /// Returns an error if the radio is gone.
    fn execute(
        &mut self,
        command: TransportCommand,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Arm the one-shot retry timer. When it fires, [`Driver::poll_event`]
    /// yields [`AppEvent::RetryElapsed`] with `token`.
    fn schedule_retry(&mut self, after: Duration, token: RetryToken);

    /// Disarm the retry timer armed with `token`, if still pending.
    fn cancel_retry(&mut self, token: RetryToken);

    /// Current time instant.
    fn now(&self) -> Self::Instant;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &App<Self::Instant>) -> Result<(), Self::Error>;

    /// Stop the radio and clean up resources.
    fn stop(&mut self);
}
