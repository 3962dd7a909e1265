//! Application side-effects and intents.
//!
//! This module defines the [`AppAction`] enum, which represents instructions
//! produced by the [`crate::App`] state machine for the runtime to execute.

use std::time::Duration;

use houston_core::{RetryToken, TransportCommand};

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Quit the application.
    Quit,

    /// Forward a command to the radio.
    Transport(TransportCommand),

    /// Arm the retry timer.
    ScheduleRetry {
        /// Delay before the timer fires.
        after: Duration,
        /// Token to deliver back in [`crate::AppEvent::RetryElapsed`].
        token: RetryToken,
    },

    /// Disarm the retry timer.
    CancelRetry {
        /// Token of the timer to drop.
        token: RetryToken,
    },
}
