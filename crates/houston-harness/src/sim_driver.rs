//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the terminal driver but for
//! deterministic testing. It implements [`Driver`] so the same
//! [`houston_app::Runtime`] orchestration code runs in both production and
//! simulation.
//!
//! Everything happens on one virtual timeline: peripheral responses, scripted
//! user input, radio power changes and the retry timer. `poll_event` pops the
//! earliest entry, moves the [`SimEnv`] clock to it and hands the event to the
//! runtime. The run ends when the timeline is empty or passes the deadline.

use std::{collections::BTreeMap, time::Duration};

use houston_app::{App, AppEvent, Driver, KeyInput};
use houston_core::{Environment, RetryToken, TransportCommand};

use crate::{
    invariants::{InvariantRegistry, LinkSnapshot, Violation},
    sim_env::{SimEnv, SimInstant},
    sim_peripheral::{Scheduled, SimPeripheral, SimPeripheralConfig},
};

/// Error type for simulation driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

/// Something that happens at a point on the virtual timeline.
#[derive(Debug, Clone)]
enum Input {
    /// Deliver an event to the App.
    App(AppEvent),
    /// Radio powers on.
    PowerOn,
    /// Radio powers off.
    PowerOff,
    /// Peripheral drops the connection.
    DropLink,
    /// Peripheral emits a telemetry line.
    Telemetry,
}

/// Simulation driver for deterministic testing.
///
/// Implements [`Driver`] so the same [`houston_app::Runtime`] orchestration
/// code runs in both the production TUI and simulation tests.
#[derive(Debug)]
pub struct SimDriver {
    env: SimEnv,
    peripheral: SimPeripheral,
    /// Pending inputs keyed by (time, insertion order).
    timeline: BTreeMap<(SimInstant, u64), Input>,
    seq: u64,
    /// Armed retry timer.
    retry: Option<(SimInstant, RetryToken)>,
    deadline: SimInstant,
    stopped: bool,

    commands: Vec<TransportCommand>,
    renders: usize,
    last_frame: String,
    invariants: Option<InvariantRegistry>,
    violations: Vec<(SimInstant, Violation)>,
}

impl SimDriver {
    /// Create a driver around a simulated peripheral.
    ///
    /// The radio stays off until [`SimDriver::power_on_at`] schedules it.
    pub fn new(config: SimPeripheralConfig) -> Self {
        Self {
            env: SimEnv::new(),
            peripheral: SimPeripheral::new(config),
            timeline: BTreeMap::new(),
            seq: 0,
            retry: None,
            deadline: SimInstant::from_start(Duration::from_secs(60)),
            stopped: false,
            commands: Vec::new(),
            renders: 0,
            last_frame: String::new(),
            invariants: None,
            violations: Vec::new(),
        }
    }

    /// Enable invariant checking after every render.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(registry);
        self
    }

    /// Stop the run once the timeline passes `deadline` (measured from start).
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = SimInstant::from_start(deadline);
        self
    }

    /// Power the radio on at `at`.
    pub fn power_on_at(&mut self, at: Duration) -> &mut Self {
        self.push(SimInstant::from_start(at), Input::PowerOn);
        self
    }

    /// Power the radio off at `at`.
    pub fn power_off_at(&mut self, at: Duration) -> &mut Self {
        self.push(SimInstant::from_start(at), Input::PowerOff);
        self
    }

    /// Have the peripheral drop the link at `at`.
    pub fn drop_link_at(&mut self, at: Duration) -> &mut Self {
        self.push(SimInstant::from_start(at), Input::DropLink);
        self
    }

    /// Have the peripheral send a telemetry line at `at`.
    pub fn telemetry_at(&mut self, at: Duration) -> &mut Self {
        self.push(SimInstant::from_start(at), Input::Telemetry);
        self
    }

    /// Deliver a key press at `at`.
    pub fn key_at(&mut self, at: Duration, key: KeyInput) -> &mut Self {
        self.push(SimInstant::from_start(at), Input::App(AppEvent::Key(key)));
        self
    }

    /// Type `text` and press Enter, all at `at`.
    pub fn type_line_at(&mut self, at: Duration, text: &str) -> &mut Self {
        for c in text.chars() {
            self.key_at(at, KeyInput::Char(c));
        }
        self.key_at(at, KeyInput::Enter)
    }

    fn push(&mut self, at: SimInstant, input: Input) {
        self.timeline.insert((at, self.seq), input);
        self.seq += 1;
    }

    fn schedule(&mut self, scheduled: Vec<Scheduled>) {
        let now = self.env.now();
        for Scheduled { after, event } in scheduled {
            self.push(now + after, Input::App(AppEvent::Transport(event)));
        }
    }

    /// Pop the earliest input, preferring the timeline over the retry timer
    /// on ties.
    fn next_input(&mut self) -> Option<(SimInstant, Input)> {
        let head = self.timeline.first_key_value().map(|(&(at, _), _)| at);

        match (head, self.retry) {
            (None, None) => None,
            (Some(at), Some((retry_at, _))) if at <= retry_at => self.pop_timeline(),
            (Some(_), None) => self.pop_timeline(),
            (_, Some((retry_at, token))) => {
                self.retry = None;
                Some((retry_at, Input::App(AppEvent::RetryElapsed { token })))
            },
        }
    }

    fn pop_timeline(&mut self) -> Option<(SimInstant, Input)> {
        self.timeline.pop_first().map(|((at, _), input)| (at, input))
    }

    fn check_invariants(&mut self, app: &App<SimInstant>) {
        let Some(registry) = &self.invariants else { return };
        if let Err(violations) = registry.check_all(&LinkSnapshot::from_app(app)) {
            let now = self.env.now();
            for violation in violations {
                tracing::error!(at = ?now, "{violation}");
                self.violations.push((now, violation));
            }
        }
    }

    /// Simulation environment (shared clock).
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Simulated peripheral.
    pub fn peripheral(&self) -> &SimPeripheral {
        &self.peripheral
    }

    /// Every command the runtime issued, oldest first.
    pub fn commands(&self) -> &[TransportCommand] {
        &self.commands
    }

    /// Number of renders requested.
    pub fn renders(&self) -> usize {
        self.renders
    }

    /// Transcript text as of the last render.
    pub fn last_frame(&self) -> &str {
        &self.last_frame
    }

    /// Invariant violations observed, with the time they were seen.
    pub fn violations(&self) -> &[(SimInstant, Violation)] {
        &self.violations
    }

    /// True once the runtime has stopped the driver.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;
    type Instant = SimInstant;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        if self.stopped {
            return Err(SimDriverError("polled after stop".to_string()));
        }

        while let Some((at, input)) = self.next_input() {
            if at > self.deadline {
                return Ok(None);
            }
            self.env.advance_to(at);

            let scheduled = match input {
                Input::App(event) => return Ok(Some(event)),
                Input::PowerOn => self.peripheral.power_on(),
                Input::PowerOff => self.peripheral.power_off(),
                Input::DropLink => self.peripheral.drop_link(),
                Input::Telemetry => self.peripheral.telemetry(),
            };
            self.schedule(scheduled);
        }
        Ok(None)
    }

    async fn execute(&mut self, command: TransportCommand) -> Result<(), Self::Error> {
        let scheduled = self.peripheral.handle(&command);
        self.commands.push(command);
        self.schedule(scheduled);
        Ok(())
    }

    fn schedule_retry(&mut self, after: Duration, token: RetryToken) {
        self.retry = Some((self.env.now() + after, token));
    }

    fn cancel_retry(&mut self, token: RetryToken) {
        if self.retry.is_some_and(|(_, armed)| armed == token) {
            self.retry = None;
        }
    }

    fn now(&self) -> SimInstant {
        self.env.now()
    }

    fn render(&mut self, app: &App<SimInstant>) -> Result<(), Self::Error> {
        self.renders += 1;
        self.last_frame = app.transcript().render();
        self.check_invariants(app);
        Ok(())
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}
