//! Link state machine.
//!
//! Drives one BLE link from scan to a subscribed characteristic, detects
//! failure, and re-arms a scan after a fixed cooldown. Uses the action
//! pattern: [`Link::handle`] takes an event and the current time and returns
//! actions for the driver to execute. The link owns the framer and the
//! transcript, so inbound notifications and outbound submissions land in the
//! scrollback without the driver's involvement.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ PoweredOn ┌──────────┐ name match ┌────────────┐ Connected ┌────────────────────┐
//! │ Idle │──────────>│ Scanning │───────────>│ Connecting │──────────>│ DiscoveringService │
//! └──────┘           └──────────┘            └────────────┘           └────────────────────┘
//!    ↑                    ↑                        │                            │ FFE0 found
//!    │ PoweredOff         │ cooldown               │ ConnectFailed              ↓
//!    │ (any state)        │ (powered)              ↓                ┌───────────────────────────┐
//!    │               ┌────────┐<────────────────────────────────────│ DiscoveringCharacteristic │
//!    └───────────────│ Failed │   missing id / Disconnected         └───────────────────────────┘
//!                    └────────┘<──────────┐                                 │ FFE1 found
//!                                         │                                 ↓
//!                                    ┌───────┐        Subscribe      ┌─────────────┐
//!                                    │ Ready │<──────────────────────│ Subscribing │
//!                                    └───────┘                       └─────────────┘
//! ```
//!
//! Entering `Failed` or `Idle` clears both the peripheral and characteristic
//! handles, whichever step failed.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use tracing::{debug, info, trace, warn};

use crate::{
    config::LinkConfig,
    error::LinkError,
    framer::Framer,
    transcript::{DisplayLine, Transcript},
    transport::{
        CharacteristicHandle, PeripheralHandle, PeripheralId, ServiceHandle, TransportCommand,
        TransportEvent,
    },
};

/// Identifies one armed retry timer.
///
/// Tokens increase monotonically. Only the most recently armed token can
/// fire; any other is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RetryToken(pub u64);

/// Link state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// Waiting for the radio to power on
    Idle,
    /// Scanning for the configured device
    Scanning,
    /// Connect issued, waiting for the outcome
    Connecting,
    /// Connected, discovering the service
    DiscoveringService,
    /// Service found, discovering the characteristic
    DiscoveringCharacteristic,
    /// Characteristic found, enabling notifications
    Subscribing,
    /// Subscribed; text can flow both ways
    Ready,
    /// Attempt failed; a retry is pending or suppressed
    Failed(LinkError),
}

impl LinkState {
    /// Status line text for this state.
    pub fn status(&self) -> String {
        match self {
            Self::Idle => LinkError::TransportUnavailable.to_string(),
            Self::Scanning => "Searching for device".to_string(),
            Self::Connecting => "Connecting (stage 1 of 3)".to_string(),
            Self::DiscoveringService => "Connecting (stage 2 of 3)".to_string(),
            Self::DiscoveringCharacteristic | Self::Subscribing => {
                "Connecting (stage 3 of 3)".to_string()
            },
            Self::Ready => "Connected".to_string(),
            Self::Failed(reason) => format!("Connection failed: {reason}"),
        }
    }

    /// True while the link owns a peripheral handle.
    pub fn holds_peripheral(&self) -> bool {
        matches!(
            self,
            Self::Connecting
                | Self::DiscoveringService
                | Self::DiscoveringCharacteristic
                | Self::Subscribing
                | Self::Ready
        )
    }
}

/// Inputs to the link state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Event delivered by the radio.
    Transport(TransportEvent),

    /// A retry timer armed by [`LinkAction::ScheduleRetry`] elapsed.
    RetryElapsed {
        /// Token the timer was armed with.
        token: RetryToken,
    },
}

impl From<TransportEvent> for LinkEvent {
    fn from(event: TransportEvent) -> Self {
        Self::Transport(event)
    }
}

/// Actions returned by the link state machine.
///
/// The driver executes these:
/// - `Transport`: forward the command to the radio
/// - `ScheduleRetry`: arm a one-shot timer, then feed back
///   [`LinkEvent::RetryElapsed`] with the same token
/// - `CancelRetry`: drop the timer armed with this token
/// - `RenderTranscript` / `RenderStatus`: refresh the render sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    /// Issue a radio command
    Transport(TransportCommand),

    /// Arm a retry timer
    ScheduleRetry {
        /// Delay before the timer fires
        after: Duration,
        /// Token to report back when it fires
        token: RetryToken,
    },

    /// Disarm a pending retry timer
    CancelRetry {
        /// Token of the timer to drop
        token: RetryToken,
    },

    /// Transcript changed
    RenderTranscript,

    /// Status text changed
    RenderStatus(String),
}

/// Link state machine
///
/// Owns the peripheral and characteristic handles, the framer and the
/// transcript. Pure: no I/O, time is passed in.
///
/// Generic over `Instant` to support both real time and virtual time for
/// deterministic testing.
#[derive(Debug, Clone)]
pub struct Link<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Configuration
    config: LinkConfig,
    /// Current state
    state: LinkState,
    /// Last power state reported by the radio
    powered: bool,
    /// Selected device. `Some` only while a connection attempt is live.
    peripheral: Option<PeripheralHandle>,
    /// Subscribed characteristic. `Some` only while `Ready`.
    characteristic: Option<CharacteristicHandle>,
    /// Armed retry timer, if any
    pending_retry: Option<RetryToken>,
    /// Next retry token to hand out
    next_token: u64,
    /// Inbound line framer
    framer: Framer<I>,
    /// Scrollback
    transcript: Transcript,
    /// Most recent error, for display
    last_error: Option<LinkError>,
}

impl<I> Link<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a link in [`LinkState::Idle`].
    pub fn new(config: LinkConfig) -> Self {
        let framer = Framer::new(config.continuation_threshold);
        let transcript = Transcript::new(config.max_lines);
        Self {
            config,
            state: LinkState::Idle,
            powered: false,
            peripheral: None,
            characteristic: None,
            pending_retry: None,
            next_token: 0,
            framer,
            transcript,
            last_error: None,
        }
    }

    /// Process an event and return actions for the driver.
    pub fn handle(&mut self, event: LinkEvent, now: I) -> Vec<LinkAction> {
        match event {
            LinkEvent::Transport(event) => self.handle_transport(event, now),
            LinkEvent::RetryElapsed { token } => self.handle_retry(token),
        }
    }

    /// Submit a line of user text.
    ///
    /// When ready, the text is written without response and echoed as `>> `.
    /// Otherwise nothing is written and the text is echoed as `x> `. Either
    /// way the echo starts a fresh line and closes any open inbound line.
    pub fn submit(&mut self, text: &str) -> Vec<LinkAction> {
        let mut actions = Vec::new();
        self.framer.close_line();

        match (&self.state, self.characteristic) {
            (LinkState::Ready, Some(characteristic)) => {
                debug!(len = text.len(), "writing to {}", characteristic.uuid);
                actions.push(LinkAction::Transport(TransportCommand::Write {
                    characteristic,
                    value: text.as_bytes().to_vec(),
                }));
                self.transcript.append(DisplayLine::outbound(text));
            },
            _ => {
                let error = LinkError::WriteAttemptedWhileNotReady;
                warn!(state = ?self.state, "{error}, dropping outbound text");
                self.last_error = Some(error);
                self.transcript.append(DisplayLine::failed(text));
            },
        }

        actions.push(LinkAction::RenderTranscript);
        actions
    }

    fn handle_transport(&mut self, event: TransportEvent, now: I) -> Vec<LinkAction> {
        if let Some(peripheral) = event.peripheral()
            && !matches!(event, TransportEvent::Discovered { .. })
            && !self.owns(peripheral)
        {
            trace!(%peripheral, ?event, "ignoring event for unselected peripheral");
            return vec![];
        }

        match (&self.state, event) {
            (_, TransportEvent::PoweredOn) => self.power_on(),
            (_, TransportEvent::PoweredOff) => self.power_off(),

            (LinkState::Scanning, TransportEvent::Discovered { peripheral, name }) => {
                match name {
                    Some(name) if name == self.config.device_name => {
                        info!(%peripheral, "found {name}");
                        self.peripheral = Some(PeripheralHandle { id: peripheral, name });
                        let mut actions = vec![
                            LinkAction::Transport(TransportCommand::StopScan),
                            LinkAction::Transport(TransportCommand::Connect { peripheral }),
                        ];
                        actions.extend(self.transition(LinkState::Connecting));
                        actions
                    },
                    other => {
                        trace!(%peripheral, name = ?other, "ignoring advertisement");
                        vec![]
                    },
                }
            },

            (LinkState::Connecting, TransportEvent::Connected { peripheral }) => {
                let mut actions = vec![LinkAction::Transport(TransportCommand::DiscoverServices {
                    peripheral,
                    services: vec![self.config.service],
                })];
                actions.extend(self.transition(LinkState::DiscoveringService));
                actions
            },

            (LinkState::Connecting, TransportEvent::ConnectFailed { .. }) => {
                self.fail(LinkError::ConnectFailed)
            },

            (LinkState::DiscoveringService, TransportEvent::ServicesFound { peripheral, services }) => {
                if !services.contains(&self.config.service) {
                    return self.fail(LinkError::ServiceNotFound);
                }

                let service = ServiceHandle { peripheral, uuid: self.config.service };
                let mut actions =
                    vec![LinkAction::Transport(TransportCommand::DiscoverCharacteristics {
                        service,
                        characteristics: vec![self.config.characteristic],
                    })];
                actions.extend(self.transition(LinkState::DiscoveringCharacteristic));
                actions
            },

            (
                LinkState::DiscoveringCharacteristic,
                TransportEvent::CharacteristicsFound { service, characteristics },
            ) => {
                if service.uuid != self.config.service
                    || !characteristics.contains(&self.config.characteristic)
                {
                    return self.fail(LinkError::CharacteristicNotFound);
                }

                let characteristic =
                    CharacteristicHandle { service, uuid: self.config.characteristic };
                self.characteristic = Some(characteristic);

                // Notifications are fire-and-forget; the link is usable as
                // soon as the subscribe request is out.
                let mut actions = self.transition(LinkState::Subscribing);
                actions.push(LinkAction::Transport(TransportCommand::Subscribe { characteristic }));
                actions.extend(self.transition(LinkState::Ready));
                actions
            },

            (state, TransportEvent::Disconnected { peripheral }) if state.holds_peripheral() => {
                info!(%peripheral, "peripheral disconnected");
                self.fail(LinkError::Disconnected)
            },

            (LinkState::Ready, TransportEvent::ValueUpdated { characteristic, value }) => {
                if Some(characteristic) != self.characteristic {
                    trace!(uuid = %characteristic.uuid, "ignoring notification");
                    return vec![];
                }

                let fragments = self.framer.push(&value, now);
                if fragments.is_empty() {
                    return vec![];
                }
                self.transcript.apply(fragments);
                vec![LinkAction::RenderTranscript]
            },

            (_, TransportEvent::WriteFailed { characteristic }) => {
                warn!(uuid = %characteristic.uuid, "write without response was not queued");
                vec![]
            },

            (state, event) => {
                trace!(?state, ?event, "ignoring event");
                vec![]
            },
        }
    }

    fn handle_retry(&mut self, token: RetryToken) -> Vec<LinkAction> {
        if self.pending_retry != Some(token) {
            trace!(?token, "ignoring stale retry timer");
            return vec![];
        }
        self.pending_retry = None;

        if !matches!(self.state, LinkState::Failed(_)) {
            return vec![];
        }

        if !self.powered {
            debug!("retry cooldown elapsed while radio is off, staying failed");
            return vec![];
        }

        self.start_scan()
    }

    fn power_on(&mut self) -> Vec<LinkAction> {
        self.powered = true;
        let mut actions = self.cancel_retry();
        self.clear_handles();
        self.framer.reset();
        actions.extend(self.start_scan());
        actions
    }

    fn power_off(&mut self) -> Vec<LinkAction> {
        self.powered = false;
        let mut actions = self.cancel_retry();
        self.clear_handles();
        self.framer.reset();
        self.last_error = Some(LinkError::TransportUnavailable);
        actions.extend(self.transition(LinkState::Idle));
        actions
    }

    fn start_scan(&mut self) -> Vec<LinkAction> {
        let mut actions =
            vec![LinkAction::Transport(TransportCommand::Scan { service: self.config.service })];
        actions.extend(self.transition(LinkState::Scanning));
        actions
    }

    /// Enter `Failed`, clear both handles and arm the retry timer.
    fn fail(&mut self, error: LinkError) -> Vec<LinkAction> {
        warn!(state = ?self.state, "connection failed: {error}");

        self.clear_handles();
        self.framer.reset();
        self.last_error = Some(error.clone());

        let retry = error.retries_automatically();
        let mut actions = self.transition(LinkState::Failed(error));

        if retry {
            let token = RetryToken(self.next_token);
            self.next_token += 1;
            self.pending_retry = Some(token);
            actions.push(LinkAction::ScheduleRetry { after: self.config.retry_cooldown, token });
        }

        actions
    }

    fn cancel_retry(&mut self) -> Vec<LinkAction> {
        match self.pending_retry.take() {
            Some(token) => vec![LinkAction::CancelRetry { token }],
            None => vec![],
        }
    }

    fn clear_handles(&mut self) {
        self.peripheral = None;
        self.characteristic = None;
    }

    fn transition(&mut self, next: LinkState) -> Vec<LinkAction> {
        debug!(from = ?self.state, to = ?next, "link transition");
        let changed = self.state.status() != next.status();
        self.state = next;
        if changed { vec![LinkAction::RenderStatus(self.state.status())] } else { vec![] }
    }

    /// True if `peripheral` is the device this link has selected.
    fn owns(&self, peripheral: PeripheralId) -> bool {
        self.peripheral.as_ref().is_some_and(|p| p.id == peripheral)
    }

    /// Current link state.
    pub fn state(&self) -> &LinkState {
        &self.state
    }

    /// Status line text.
    pub fn status(&self) -> String {
        self.state.status()
    }

    /// True when text can be written.
    pub fn is_ready(&self) -> bool {
        self.state == LinkState::Ready
    }

    /// Last power state reported by the radio.
    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Selected peripheral. `None` outside a connection attempt.
    pub fn peripheral(&self) -> Option<&PeripheralHandle> {
        self.peripheral.as_ref()
    }

    /// Subscribed characteristic. `None` unless ready.
    pub fn characteristic(&self) -> Option<&CharacteristicHandle> {
        self.characteristic.as_ref()
    }

    /// Token of the armed retry timer. `None` if no retry is pending.
    pub fn pending_retry(&self) -> Option<RetryToken> {
        self.pending_retry
    }

    /// Scrollback.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Most recent error. `None` if nothing has failed yet.
    pub fn last_error(&self) -> Option<&LinkError> {
        self.last_error.as_ref()
    }

    /// Configuration.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CHARACTERISTIC_UUID, SERVICE_UUID};

    const HOUSTON: PeripheralId = PeripheralId(7);

    fn ready_link() -> Link {
        let mut link = Link::new(LinkConfig::default());
        let now = Instant::now();
        for event in [
            TransportEvent::PoweredOn,
            TransportEvent::Discovered { peripheral: HOUSTON, name: Some("Houston".into()) },
            TransportEvent::Connected { peripheral: HOUSTON },
            TransportEvent::ServicesFound { peripheral: HOUSTON, services: vec![SERVICE_UUID] },
            TransportEvent::CharacteristicsFound {
                service: ServiceHandle { peripheral: HOUSTON, uuid: SERVICE_UUID },
                characteristics: vec![CHARACTERISTIC_UUID],
            },
        ] {
            let _ = link.handle(event.into(), now);
        }
        link
    }

    #[test]
    fn starts_idle_without_handles() {
        let link: Link = Link::new(LinkConfig::default());
        assert_eq!(link.state(), &LinkState::Idle);
        assert!(link.peripheral().is_none());
        assert!(link.characteristic().is_none());
        assert_eq!(link.status(), "Bluetooth is not available");
    }

    #[test]
    fn power_on_scans_for_service() {
        let mut link: Link = Link::new(LinkConfig::default());
        let actions = link.handle(TransportEvent::PoweredOn.into(), Instant::now());

        assert_eq!(actions, [
            LinkAction::Transport(TransportCommand::Scan { service: SERVICE_UUID }),
            LinkAction::RenderStatus("Searching for device".into()),
        ]);
        assert_eq!(link.state(), &LinkState::Scanning);
    }

    #[test]
    fn discovery_of_other_names_is_ignored() {
        let mut link: Link = Link::new(LinkConfig::default());
        let now = Instant::now();
        let _ = link.handle(TransportEvent::PoweredOn.into(), now);

        for name in [Some("houston"), Some("Houston2"), None] {
            let actions = link.handle(
                TransportEvent::Discovered {
                    peripheral: PeripheralId(1),
                    name: name.map(String::from),
                }
                .into(),
                now,
            );
            assert!(actions.is_empty());
        }
        assert_eq!(link.state(), &LinkState::Scanning);
        assert!(link.peripheral().is_none());
    }

    #[test]
    fn full_handshake_reaches_ready() {
        let link = ready_link();
        assert!(link.is_ready());
        assert_eq!(link.status(), "Connected");
        assert_eq!(link.peripheral().map(|p| p.id), Some(HOUSTON));
        assert_eq!(link.characteristic().map(|c| c.uuid), Some(CHARACTERISTIC_UUID));
    }

    #[test]
    fn disconnect_while_ready_fails_and_arms_retry() {
        let mut link = ready_link();
        let actions =
            link.handle(TransportEvent::Disconnected { peripheral: HOUSTON }.into(), Instant::now());

        assert_eq!(link.state(), &LinkState::Failed(LinkError::Disconnected));
        assert!(link.peripheral().is_none());
        assert!(link.characteristic().is_none());
        assert!(actions.contains(&LinkAction::ScheduleRetry {
            after: Duration::from_secs(2),
            token: RetryToken(0),
        }));
        assert_eq!(link.status(), "Connection failed: Device disconnected");
    }

    #[test]
    fn events_for_other_peripherals_are_ignored() {
        let mut link = ready_link();
        let actions = link.handle(
            TransportEvent::Disconnected { peripheral: PeripheralId(99) }.into(),
            Instant::now(),
        );

        assert!(actions.is_empty());
        assert!(link.is_ready());
    }

    #[test]
    fn submit_while_ready_writes_once() {
        let mut link = ready_link();
        let actions = link.submit("ack");

        let writes: Vec<_> = actions
            .iter()
            .filter_map(|a| match a {
                LinkAction::Transport(TransportCommand::Write { value, .. }) => Some(value),
                _ => None,
            })
            .collect();
        assert_eq!(writes, [&b"ack".to_vec()]);
        assert_eq!(link.transcript().last(), Some(&DisplayLine::outbound("ack")));
    }

    #[test]
    fn submit_while_not_ready_never_writes() {
        let mut link: Link = Link::new(LinkConfig::default());
        let actions = link.submit("ping");

        assert_eq!(actions, [LinkAction::RenderTranscript]);
        assert_eq!(link.transcript().last(), Some(&DisplayLine::failed("ping")));
        assert_eq!(link.last_error(), Some(&LinkError::WriteAttemptedWhileNotReady));
    }

    #[test]
    fn power_off_cancels_pending_retry() {
        let mut link = ready_link();
        let now = Instant::now();
        let _ = link.handle(TransportEvent::Disconnected { peripheral: HOUSTON }.into(), now);

        let actions = link.handle(TransportEvent::PoweredOff.into(), now);
        assert_eq!(actions, [
            LinkAction::CancelRetry { token: RetryToken(0) },
            LinkAction::RenderStatus("Bluetooth is not available".into()),
        ]);
        assert_eq!(link.state(), &LinkState::Idle);
        assert!(link.pending_retry().is_none());
    }
}
