//! Deterministic simulation harness for Houston.
//!
//! A virtual clock, a scripted BLE peripheral and a [`Driver`] implementation
//! that runs the production [`houston_app::Runtime`] without a radio, a
//! terminal or wall-clock time. Every run is reproducible from its seed.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the common
//! link invariants.
//!
//! [`Driver`]: houston_app::Driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod invariants;
pub mod sim_driver;
pub mod sim_env;
pub mod sim_peripheral;

pub use invariants::{
    HandlesMatchState, Invariant, InvariantRegistry, InvariantResult, LinkSnapshot,
    RetryArmedWhileFailed, StatusMatchesState, TranscriptBounded, Violation,
};
pub use sim_driver::{SimDriver, SimDriverError};
pub use sim_env::{SimEnv, SimInstant};
pub use sim_peripheral::{Scheduled, SimFault, SimPeripheral, SimPeripheralConfig};
