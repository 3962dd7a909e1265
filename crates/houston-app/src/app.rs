//! Application state machine.
//!
//! This module defines the [`App`] state machine, which manages the interactive
//! state of the terminal completely decoupled from I/O.
//!
//! This is a pure state machine: it consumes [`crate::AppEvent`] inputs and
//! produces [`crate::AppAction`] instructions for the runtime to execute.
//!
//! # Responsibilities
//!
//! - Owns the [`Link`], which in turn owns the transcript.
//! - Owns the input line and turns Enter into a link submission.
//! - Stores terminal dimensions to handle resize events.
//! - Tracks a transient notice for the status bar.
//! - Keeps the status text last announced by the link for the status bar.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use houston_core::{
    Link, LinkAction, LinkConfig, LinkError, LinkEvent, LinkState, Transcript, TransportEvent,
};

use crate::{AppAction, AppEvent, InputLine, LineEdit};

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies - fully testable in simulation.
#[derive(Debug, Clone)]
pub struct App<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// BLE link and transcript.
    link: Link<I>,
    /// Line being typed.
    input: InputLine,
    /// Terminal dimensions (columns, rows).
    terminal_size: (u16, u16),
    /// Transient notice shown next to the status. `None` if no notice.
    notice: Option<String>,
    /// Status text from the most recent [`LinkAction::RenderStatus`].
    status: String,
}

impl<I> App<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a new App with the given link configuration.
    pub fn new(config: LinkConfig) -> Self {
        let link = Link::new(config);
        let status = link.status();
        Self { link, input: InputLine::new(), terminal_size: (80, 24), notice: None, status }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent, now: I) -> Vec<AppAction> {
        match event {
            AppEvent::Tick => vec![],
            AppEvent::Resize(cols, rows) => {
                self.terminal_size = (cols, rows);
                vec![AppAction::Render]
            },
            AppEvent::Key(key) => match self.input.handle_key(key) {
                LineEdit::Edited => vec![AppAction::Render],
                LineEdit::Unchanged => vec![],
                LineEdit::Quit => vec![AppAction::Quit],
                LineEdit::Submit(text) => self.submit(&text),
            },
            AppEvent::Transport(event) => {
                let write_failed = matches!(
                    &event,
                    TransportEvent::WriteFailed { characteristic }
                        if self.link.characteristic() == Some(characteristic)
                );
                let actions = self.link.handle(LinkEvent::Transport(event), now);
                let mut out = self.translate(actions);
                if write_failed {
                    self.notice = Some("Write failed".to_string());
                    if !out.contains(&AppAction::Render) {
                        out.push(AppAction::Render);
                    }
                }
                out
            },
            AppEvent::RetryElapsed { token } => {
                let actions = self.link.handle(LinkEvent::RetryElapsed { token }, now);
                self.translate(actions)
            },
        }
    }

    /// Submit a line of text to the link.
    ///
    /// Used by the Enter key; exposed for drivers that inject whole lines.
    pub fn submit(&mut self, text: &str) -> Vec<AppAction> {
        let actions = self.link.submit(text);
        if !self.link.is_ready() {
            self.notice = Some(format!("{}: text not sent", LinkError::WriteAttemptedWhileNotReady));
        }
        self.translate(actions)
    }

    /// Map link actions to app actions, collapsing render requests into one
    /// trailing [`AppAction::Render`].
    fn translate(&mut self, actions: Vec<LinkAction>) -> Vec<AppAction> {
        let mut out = Vec::with_capacity(actions.len());
        let mut render = false;

        for action in actions {
            match action {
                LinkAction::Transport(command) => out.push(AppAction::Transport(command)),
                LinkAction::ScheduleRetry { after, token } => {
                    out.push(AppAction::ScheduleRetry { after, token });
                },
                LinkAction::CancelRetry { token } => out.push(AppAction::CancelRetry { token }),
                LinkAction::RenderTranscript => render = true,
                LinkAction::RenderStatus(status) => {
                    tracing::info!("{status}");
                    if self.link.is_ready() {
                        self.notice = None;
                    }
                    self.status = status;
                    render = true;
                },
            }
        }

        if render {
            out.push(AppAction::Render);
        }
        out
    }

    /// BLE link.
    pub fn link(&self) -> &Link<I> {
        &self.link
    }

    /// Current link state.
    pub fn link_state(&self) -> &LinkState {
        self.link.state()
    }

    /// Status line text, as last announced by the link.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Scrollback.
    pub fn transcript(&self) -> &Transcript {
        self.link.transcript()
    }

    /// Line being typed.
    pub fn input(&self) -> &InputLine {
        &self.input
    }

    /// Terminal dimensions (columns, rows).
    pub fn terminal_size(&self) -> (u16, u16) {
        self.terminal_size
    }

    /// Transient notice. `None` if no notice.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }
}
