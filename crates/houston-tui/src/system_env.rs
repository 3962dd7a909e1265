//! Production Environment implementation using system time.
//!
//! `SystemEnv` is the production implementation of the Environment trait,
//! backed by the real monotonic clock.

use houston_core::Environment;

/// Production environment using system time.
///
/// Uses `std::time::Instant::now()` for time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }
}
