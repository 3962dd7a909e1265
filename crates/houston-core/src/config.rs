//! Link configuration.
//!
//! The defaults describe the one peripheral this terminal talks to. They are
//! fixed once the [`crate::Link`] is constructed; nothing changes them while
//! the process runs.

use std::time::Duration;

use crate::uuid::ShortUuid;

/// Advertised name of the peripheral to connect to.
pub const DEFAULT_DEVICE_NAME: &str = "Houston";

/// Service carrying the serial bridge.
pub const SERVICE_UUID: ShortUuid = ShortUuid::new(0xFFE0);

/// Characteristic used for both notifications and writes.
pub const CHARACTERISTIC_UUID: ShortUuid = ShortUuid::new(0xFFE1);

/// Scrollback capacity in lines.
pub const DEFAULT_MAX_LINES: usize = 100;

/// Inbound text arriving within this gap continues the open line.
pub const DEFAULT_CONTINUATION_THRESHOLD: Duration = Duration::from_secs(1);

/// Delay between a link failure and the next scan.
pub const DEFAULT_RETRY_COOLDOWN: Duration = Duration::from_secs(2);

/// Link configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Advertised name that selects the peripheral (exact match)
    pub device_name: String,
    /// Service to scan for and discover
    pub service: ShortUuid,
    /// Notification/write characteristic within `service`
    pub characteristic: ShortUuid,
    /// Transcript capacity in lines
    pub max_lines: usize,
    /// Idle gap after which inbound text starts a new line
    pub continuation_threshold: Duration,
    /// Cooldown between failure and rescan
    pub retry_cooldown: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            service: SERVICE_UUID,
            characteristic: CHARACTERISTIC_UUID,
            max_lines: DEFAULT_MAX_LINES,
            continuation_threshold: DEFAULT_CONTINUATION_THRESHOLD,
            retry_cooldown: DEFAULT_RETRY_COOLDOWN,
        }
    }
}
