//! Error types for the Houston core.
//!
//! [`LinkError`] is the link failure taxonomy. Its `Display` text doubles as
//! the failure reason shown in the status line, so the messages are written
//! for the user rather than for a log file.

use thiserror::Error;

/// Link failures.
///
/// Every variant is recoverable by policy: a failed link re-enters scanning
/// after the retry cooldown. The exception is [`LinkError::TransportUnavailable`],
/// which halts automatic progress until the radio reports powered-on again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Transport reported that the connect request failed.
    #[error("Failed to connect")]
    ConnectFailed,

    /// Service discovery completed without the configured service.
    #[error("Required service not found")]
    ServiceNotFound,

    /// Characteristic discovery completed without the configured characteristic.
    #[error("Required characteristic not found")]
    CharacteristicNotFound,

    /// Peripheral dropped the connection.
    #[error("Device disconnected")]
    Disconnected,

    /// Radio is powered off or otherwise unusable.
    #[error("Bluetooth is not available")]
    TransportUnavailable,

    /// User submitted text while the link was not ready.
    #[error("Not connected")]
    WriteAttemptedWhileNotReady,
}

impl LinkError {
    /// Returns true if the link re-enters scanning on its own after this
    /// error.
    ///
    /// Only [`LinkError::TransportUnavailable`] stops the retry loop; the
    /// radio itself has to come back before anything else can happen.
    pub fn retries_automatically(&self) -> bool {
        !matches!(self, Self::TransportUnavailable)
    }
}

/// Errors parsing a 16-bit GATT identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UuidError {
    /// Identifier was not exactly four hex digits.
    #[error("expected 4 hex digits, got {input:?}")]
    InvalidLength {
        /// Rejected input.
        input: String,
    },

    /// Identifier contained a non-hex character.
    #[error("invalid hex digit in {input:?}")]
    InvalidDigit {
        /// Rejected input.
        input: String,
    },
}
