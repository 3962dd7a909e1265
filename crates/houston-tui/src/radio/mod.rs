//! Radio backends for the terminal.
//!
//! Provides [`RadioHandle`], which bridges the [`TerminalDriver`] and a radio
//! running on its own tokio task. Commands go in over one channel, events come
//! back over another. Link logic stays in the Sans-IO [`houston_core::Link`].
//!
//! Two backends exist: the host Bluetooth adapter (with the `bluetooth`
//! feature) and an in-process simulated peripheral.
//!
//! [`TerminalDriver`]: crate::TerminalDriver

#[cfg(feature = "bluetooth")]
mod ble;
mod sim;

use std::{future::Future, time::Duration};

use houston_core::{TransportCommand, TransportEvent};
use houston_harness::{SimPeripheral, SimPeripheralConfig};
use tokio::sync::mpsc;

const CHANNEL_CAPACITY: usize = 32;

/// Handle to the radio task.
pub struct RadioHandle {
    /// Send commands to the radio.
    pub commands: mpsc::Sender<TransportCommand>,
    /// Receive events from the radio.
    pub events: mpsc::Receiver<TransportEvent>,
    /// Abort handle to stop the radio task.
    abort_handle: tokio::task::AbortHandle,
}

impl RadioHandle {
    /// Spawn the radio task around a simulated peripheral.
    ///
    /// The simulated radio powers on as soon as the task starts. With
    /// `telemetry_every` set, the peripheral emits a telemetry line on that
    /// period once it is subscribed.
    pub fn simulated(config: SimPeripheralConfig, telemetry_every: Option<Duration>) -> Self {
        let peripheral = SimPeripheral::new(config);
        Self::spawn(move |commands, events| sim::run(peripheral, telemetry_every, commands, events))
    }

    /// Spawn the radio task around the first Bluetooth adapter of the host.
    ///
    /// Reports [`TransportEvent::PoweredOff`] if no adapter can be opened.
    #[cfg(feature = "bluetooth")]
    pub fn bluetooth() -> Self {
        Self::spawn(ble::run)
    }

    fn spawn<F, Fut>(task: F) -> Self
    where
        F: FnOnce(mpsc::Receiver<TransportCommand>, mpsc::Sender<TransportEvent>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (commands_tx, commands_rx) = mpsc::channel::<TransportCommand>(CHANNEL_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel::<TransportEvent>(CHANNEL_CAPACITY);

        let handle = tokio::spawn(task(commands_rx, events_tx));

        Self { commands: commands_tx, events: events_rx, abort_handle: handle.abort_handle() }
    }

    /// Stop the radio.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}
