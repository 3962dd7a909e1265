//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of the link at a point in time.
//! Invariants operate on snapshots rather than live state to ensure
//! consistent, atomic checks.

use std::{ops::Sub, time::Duration};

use houston_app::App;
use houston_core::{LinkState, PeripheralId};

/// Snapshot of the link's observable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSnapshot {
    /// Link state.
    pub state: LinkState,
    /// Status line text as rendered.
    pub status: String,
    /// Selected peripheral. `None` if no handle is held.
    pub peripheral: Option<PeripheralId>,
    /// Peripheral owning the characteristic. `None` if no handle is held.
    pub characteristic_owner: Option<PeripheralId>,
    /// True if a retry timer is armed.
    pub retry_pending: bool,
    /// Lines in the transcript.
    pub transcript_len: usize,
    /// Transcript cap.
    pub max_lines: usize,
}

impl LinkSnapshot {
    /// Snapshot of a freshly constructed link.
    pub fn idle(max_lines: usize) -> Self {
        Self {
            state: LinkState::Idle,
            status: LinkState::Idle.status(),
            peripheral: None,
            characteristic_owner: None,
            retry_pending: false,
            transcript_len: 0,
            max_lines,
        }
    }

    /// Capture the App's link.
    pub fn from_app<I>(app: &App<I>) -> Self
    where
        I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
    {
        let link = app.link();
        Self {
            state: link.state().clone(),
            status: app.status().to_string(),
            peripheral: link.peripheral().map(|p| p.id),
            characteristic_owner: link.characteristic().map(|c| c.peripheral()),
            retry_pending: link.pending_retry().is_some(),
            transcript_len: link.transcript().len(),
            max_lines: link.transcript().max_lines(),
        }
    }
}
