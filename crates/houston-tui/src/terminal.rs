//! Terminal driver for the TUI.
//!
//! Implements the [`Driver`] trait for terminal I/O using crossterm for
//! keyboard events and ratatui for rendering. The radio runs on its own task
//! behind a [`RadioHandle`].

use std::{
    io::{self, Stdout, stdout},
    pin::Pin,
    time::{Duration, Instant},
};

use crossterm::{
    ExecutableCommand,
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use houston_app::{App, AppEvent, Driver, KeyInput};
use houston_core::{Environment, RetryToken, TransportCommand};
use ratatui::{Terminal, backend::CrosstermBackend};
use thiserror::Error;
use tokio::time::{Interval, MissedTickBehavior, Sleep};

use crate::{RadioHandle, SystemEnv, ui};

const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Terminal driver errors.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// I/O error from terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The radio task is gone.
    #[error("radio channel closed")]
    RadioClosed,
}

/// Armed retry timer.
struct PendingRetry {
    token: RetryToken,
    sleep: Pin<Box<Sleep>>,
}

/// Terminal driver implementing the [`Driver`] trait.
///
/// Handles terminal I/O (crossterm), rendering (ratatui), the radio channels
/// and the retry timer.
pub struct TerminalDriver {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    event_stream: EventStream,
    radio: RadioHandle,
    retry: Option<PendingRetry>,
    tick: Interval,
    env: SystemEnv,
}

impl TerminalDriver {
    /// Create a new terminal driver, taking over the terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if raw mode or the alternate screen cannot be
    /// entered.
    pub fn new(radio: RadioHandle) -> Result<Self, TerminalError> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;
        let event_stream = EventStream::new();

        let mut tick = tokio::time::interval(TICK_INTERVAL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Ok(Self { terminal, event_stream, radio, retry: None, tick, env: SystemEnv::new() })
    }

    /// Convert a crossterm key event to `KeyInput`.
    ///
    /// Ctrl+C quits like Esc, since raw mode swallows the signal.
    fn convert_key(key: KeyEvent) -> Option<KeyInput> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(KeyInput::Esc);
        }

        match key.code {
            KeyCode::Char(c) => Some(KeyInput::Char(c)),
            KeyCode::Enter => Some(KeyInput::Enter),
            KeyCode::Backspace => Some(KeyInput::Backspace),
            KeyCode::Delete => Some(KeyInput::Delete),
            KeyCode::Esc => Some(KeyInput::Esc),
            KeyCode::Left => Some(KeyInput::Left),
            KeyCode::Right => Some(KeyInput::Right),
            KeyCode::Up => Some(KeyInput::Up),
            KeyCode::Down => Some(KeyInput::Down),
            KeyCode::Home => Some(KeyInput::Home),
            KeyCode::End => Some(KeyInput::End),
            _ => None,
        }
    }

    fn convert_event(event: Event) -> AppEvent {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                Self::convert_key(key).map_or(AppEvent::Tick, AppEvent::Key)
            },
            Event::Resize(cols, rows) => AppEvent::Resize(cols, rows),
            _ => AppEvent::Tick,
        }
    }
}

/// Resolves when the armed retry timer fires, disarming it.
///
/// Pending forever while no timer is armed. Dropping the future leaves the
/// timer armed.
async fn retry_elapsed(retry: &mut Option<PendingRetry>) -> RetryToken {
    let Some(pending) = retry else {
        return std::future::pending().await;
    };
    pending.sleep.as_mut().await;
    let token = pending.token;
    *retry = None;
    token
}

impl Driver for TerminalDriver {
    type Error = TerminalError;
    type Instant = Instant;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        tokio::select! {
            biased;

            // Terminal events
            maybe_event = self.event_stream.next() => match maybe_event {
                Some(Ok(event)) => Ok(Some(Self::convert_event(event))),
                Some(Err(e)) => Err(TerminalError::Io(e)),
                None => Ok(None),
            },

            // Radio events
            maybe_event = self.radio.events.recv() => match maybe_event {
                Some(event) => Ok(Some(AppEvent::Transport(event))),
                None => Err(TerminalError::RadioClosed),
            },

            token = retry_elapsed(&mut self.retry) => Ok(Some(AppEvent::RetryElapsed { token })),

            _ = self.tick.tick() => Ok(Some(AppEvent::Tick)),
        }
    }

    async fn execute(&mut self, command: TransportCommand) -> Result<(), Self::Error> {
        self.radio.commands.send(command).await.map_err(|_| TerminalError::RadioClosed)
    }

    fn schedule_retry(&mut self, after: Duration, token: RetryToken) {
        self.retry = Some(PendingRetry { token, sleep: Box::pin(tokio::time::sleep(after)) });
    }

    fn cancel_retry(&mut self, token: RetryToken) {
        if self.retry.as_ref().is_some_and(|pending| pending.token == token) {
            self.retry = None;
        }
    }

    fn now(&self) -> Self::Instant {
        self.env.now()
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        self.terminal.draw(|frame| {
            ui::render(frame, app);
        })?;
        Ok(())
    }

    fn stop(&mut self) {
        self.radio.stop();
    }
}

impl Drop for TerminalDriver {
    fn drop(&mut self) {
        self.stop();
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn ctrl_c_quits() {
        let input = TerminalDriver::convert_key(key(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(input, Some(KeyInput::Esc));
    }

    #[test]
    fn plain_keys_map_through() {
        assert_eq!(
            TerminalDriver::convert_key(key(KeyCode::Char('c'), KeyModifiers::NONE)),
            Some(KeyInput::Char('c'))
        );
        assert_eq!(
            TerminalDriver::convert_key(key(KeyCode::Home, KeyModifiers::NONE)),
            Some(KeyInput::Home)
        );
        assert_eq!(TerminalDriver::convert_key(key(KeyCode::F(1), KeyModifiers::NONE)), None);
    }

    #[test]
    fn key_release_is_a_tick() {
        let mut release = key(KeyCode::Enter, KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert_eq!(TerminalDriver::convert_event(Event::Key(release)), AppEvent::Tick);
    }

    #[test]
    fn resize_is_forwarded() {
        let event = TerminalDriver::convert_event(Event::Resize(100, 30));
        assert_eq!(event, AppEvent::Resize(100, 30));
    }

    #[tokio::test]
    async fn retry_timer_fires_and_disarms() {
        let mut retry = Some(PendingRetry {
            token: RetryToken(4),
            sleep: Box::pin(tokio::time::sleep(Duration::from_millis(5))),
        });
        assert_eq!(retry_elapsed(&mut retry).await, RetryToken(4));
        assert!(retry.is_none());
    }
}
