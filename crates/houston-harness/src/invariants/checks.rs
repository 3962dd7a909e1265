//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use houston_core::LinkState;

use super::{Invariant, InvariantResult, LinkSnapshot, Violation};

/// Transcript never holds more than `max_lines` lines.
pub struct TranscriptBounded;

impl Invariant for TranscriptBounded {
    fn name(&self) -> &'static str {
        "transcript_bounded"
    }

    fn check(&self, state: &LinkSnapshot) -> InvariantResult {
        if state.transcript_len > state.max_lines {
            return Err(Violation {
                invariant: self.name(),
                message: format!("{} lines exceed cap of {}", state.transcript_len, state.max_lines),
            });
        }
        Ok(())
    }
}

/// Handles exist exactly in the states that own them.
///
/// The peripheral handle is held from `Connecting` through `Ready`; the
/// characteristic handle only in `Ready`, and it must belong to the held
/// peripheral. A stale handle here would let a write reach a dead link.
pub struct HandlesMatchState;

impl Invariant for HandlesMatchState {
    fn name(&self) -> &'static str {
        "handles_match_state"
    }

    fn check(&self, state: &LinkSnapshot) -> InvariantResult {
        let fail = |message: String| Err(Violation { invariant: self.name(), message });

        let holds = state.state.holds_peripheral();
        if holds != state.peripheral.is_some() {
            return fail(format!("{:?} with peripheral {:?}", state.state, state.peripheral));
        }

        let ready = state.state == LinkState::Ready;
        if ready != state.characteristic_owner.is_some() {
            return fail(format!(
                "{:?} with characteristic on {:?}",
                state.state, state.characteristic_owner
            ));
        }

        if let Some(owner) = state.characteristic_owner
            && Some(owner) != state.peripheral
        {
            return fail(format!("characteristic on {owner} but peripheral is {:?}", state.peripheral));
        }
        Ok(())
    }
}

/// A retry timer is armed exactly while the link is failed.
pub struct RetryArmedWhileFailed;

impl Invariant for RetryArmedWhileFailed {
    fn name(&self) -> &'static str {
        "retry_armed_while_failed"
    }

    fn check(&self, state: &LinkSnapshot) -> InvariantResult {
        let failed = matches!(state.state, LinkState::Failed(_));
        if failed != state.retry_pending {
            return Err(Violation {
                invariant: self.name(),
                message: format!("{:?} with retry_pending={}", state.state, state.retry_pending),
            });
        }
        Ok(())
    }
}

/// The status line shows the text for the current state, and failures name
/// their reason.
pub struct StatusMatchesState;

impl Invariant for StatusMatchesState {
    fn name(&self) -> &'static str {
        "status_matches_state"
    }

    fn check(&self, state: &LinkSnapshot) -> InvariantResult {
        let expected = match &state.state {
            LinkState::Idle => "Bluetooth is not available".to_string(),
            LinkState::Scanning => "Searching for device".to_string(),
            LinkState::Connecting => "Connecting (stage 1 of 3)".to_string(),
            LinkState::DiscoveringService => "Connecting (stage 2 of 3)".to_string(),
            LinkState::DiscoveringCharacteristic | LinkState::Subscribing => {
                "Connecting (stage 3 of 3)".to_string()
            },
            LinkState::Ready => "Connected".to_string(),
            LinkState::Failed(reason) => format!("Connection failed: {reason}"),
        };

        if state.status != expected {
            return Err(Violation {
                invariant: self.name(),
                message: format!("{:?} shows {:?}, expected {expected:?}", state.state, state.status),
            });
        }
        Ok(())
    }
}
