//! Application layer for Houston
//!
//! Pure state machines and a generic runtime for the terminal, so the same
//! orchestration code runs against a real terminal and in deterministic
//! simulation.
//!
//! # Components
//!
//! - [`App`]: UI state machine (line editing, submission, link events)
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`Runtime`]: Generic orchestration loop using Driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod driver;
mod event;
mod input;
mod runtime;

pub use action::AppAction;
pub use app::App;
pub use driver::Driver;
pub use event::AppEvent;
pub use input::{InputLine, KeyInput, LineEdit};
pub use runtime::Runtime;
