//! Terminal UI for Houston
//!
//! A thin shell over [`houston_app::Driver`] that provides terminal-specific
//! I/O. All orchestration logic lives in the generic [`houston_app::Runtime`].
//!
//! This crate only handles terminal rendering, key translation and the radio
//! task.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod radio;
pub mod system_env;
pub mod terminal;
pub mod ui;

pub use houston_app::{App, AppAction, AppEvent, Driver, KeyInput, Runtime};
pub use radio::RadioHandle;
pub use system_env::SystemEnv;
pub use terminal::{TerminalDriver, TerminalError};
