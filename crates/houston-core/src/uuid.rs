//! 16-bit GATT identifiers.
//!
//! Serial-over-BLE modules (HM-10 and friends) expose their UART bridge on
//! short SIG-style identifiers such as `FFE0`/`FFE1`. Only the 16-bit form is
//! modeled here; the Bluetooth radio expands it onto the base UUID.

use std::{fmt, str::FromStr};

use crate::error::UuidError;

/// 16-bit GATT service or characteristic identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShortUuid(u16);

impl ShortUuid {
    /// Wrap a raw 16-bit identifier.
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Raw 16-bit value.
    pub const fn to_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for ShortUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

impl FromStr for ShortUuid {
    type Err = UuidError;

    /// Parse four hex digits, optionally prefixed with `0x`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);

        if digits.len() != 4 {
            return Err(UuidError::InvalidLength { input: s.to_string() });
        }

        // from_str_radix tolerates a leading '+'
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(UuidError::InvalidDigit { input: s.to_string() });
        }

        u16::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|_| UuidError::InvalidDigit { input: s.to_string() })
    }
}

impl From<u16> for ShortUuid {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}
