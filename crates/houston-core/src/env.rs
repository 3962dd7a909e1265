//! Environment abstraction for deterministic testing.
//!
//! Decouples the link and framer from the wall clock. Production drivers use
//! `std::time::Instant`; the simulation harness substitutes a virtual clock so
//! that idle thresholds and retry cooldowns can be crossed without sleeping.
//! Timers are not part of the environment: the state machines request them
//! through [`crate::LinkAction::ScheduleRetry`] and the driver arms them.

use std::time::Duration;

/// Abstract environment providing time.
///
/// # Invariants
///
/// - `now()` never goes backwards
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production uses `std::time::Instant`; simulation uses a virtual
    /// instant that only advances when the harness moves it.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;
}
