//! Virtual clock.
//!
//! Time only moves when the harness moves it, so idle thresholds and retry
//! cooldowns are crossed instantly and identically on every run.

use std::{
    ops::{Add, Sub},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use houston_core::Environment;

/// Point on the virtual timeline, measured from simulation start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Simulation start.
    pub const START: Self = Self(Duration::ZERO);

    /// Instant `offset` after simulation start.
    pub const fn from_start(offset: Duration) -> Self {
        Self(offset)
    }

    /// Time since simulation start.
    pub const fn since_start(self) -> Duration {
        self.0
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        Self(self.0.saturating_add(rhs))
    }
}

/// Simulation environment with a shared virtual clock.
///
/// Clones share the clock.
#[derive(Debug, Clone, Default)]
pub struct SimEnv {
    nanos: Arc<AtomicU64>,
}

impl SimEnv {
    /// Create an environment at simulation start.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let nanos = duration.as_nanos().min(u128::from(u64::MAX)) as u64;
        self.nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Move the clock to `instant`. Never moves it backwards.
    pub fn advance_to(&self, instant: SimInstant) {
        let nanos = instant.since_start().as_nanos().min(u128::from(u64::MAX)) as u64;
        self.nanos.fetch_max(nanos, Ordering::SeqCst);
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        SimInstant(Duration::from_nanos(self.nanos.load(Ordering::SeqCst)))
    }
}
