//! Core of the Houston BLE serial terminal.
//!
//! Everything in this crate is Sans-IO: the [`Link`] state machine consumes
//! [`LinkEvent`]s together with the current time and returns [`LinkAction`]s
//! for a driver to execute. Nothing here touches the radio, the terminal, or
//! the clock directly, so the same code runs against real hardware and in
//! deterministic simulation.
//!
//! # Components
//!
//! - [`Link`]: scanning, connection, discovery, subscription and retry
//! - [`Framer`]: turns fragmented notification bytes into display lines
//! - [`Transcript`]: bounded scrollback of [`DisplayLine`]s
//! - [`TransportCommand`] / [`TransportEvent`]: the radio boundary

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod env;
pub mod error;
pub mod framer;
pub mod link;
pub mod transcript;
pub mod transport;
pub mod uuid;

pub use config::LinkConfig;
pub use env::Environment;
pub use error::{LinkError, UuidError};
pub use framer::{Fragment, FragmentKind, Framer};
pub use link::{Link, LinkAction, LinkEvent, LinkState, RetryToken};
pub use transcript::{DisplayLine, Origin, Transcript};
pub use transport::{
    CharacteristicHandle, PeripheralHandle, PeripheralId, ServiceHandle, TransportCommand,
    TransportEvent,
};
pub use uuid::ShortUuid;
