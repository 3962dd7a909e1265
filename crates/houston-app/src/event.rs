//! Application input events.
//!
//! This module defines [`AppEvent`], the set of inputs that drive the
//! [`crate::App`] state machine.
//!
//! Events originate from three sources:
//! - User interactions (Keyboard, Resize) and system ticks.
//! - Radio events delivered by the transport.
//! - The retry timer armed by [`crate::AppAction::ScheduleRetry`].

use houston_core::{RetryToken, TransportEvent};

use crate::KeyInput;

/// Events processed by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Keyboard input.
    Key(KeyInput),

    /// Periodic tick.
    Tick,

    /// Terminal resize (columns, rows).
    Resize(u16, u16),

    /// Radio event.
    Transport(TransportEvent),

    /// Retry timer elapsed.
    RetryElapsed {
        /// Token the timer was armed with.
        token: RetryToken,
    },
}

impl From<TransportEvent> for AppEvent {
    fn from(event: TransportEvent) -> Self {
        Self::Transport(event)
    }
}
