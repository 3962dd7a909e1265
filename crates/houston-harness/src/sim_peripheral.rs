//! Simulated serial-over-BLE peripheral.
//!
//! Answers [`TransportCommand`]s the way an HM-10 style bridge would: it
//! advertises (alongside some decoys), accepts a connection, exposes the
//! serial service and characteristic, and echoes writes back as
//! notifications. Notification payloads are cut at random byte boundaries
//! so the framer sees realistic fragmentation.
//!
//! The peripheral is Sans-IO. Every method returns [`Scheduled`] events with
//! a delay relative to the caller's clock; the caller owns the timeline.

use std::time::Duration;

use houston_core::{
    CharacteristicHandle, PeripheralId, ServiceHandle, ShortUuid, TransportCommand,
    TransportEvent,
    config::{CHARACTERISTIC_UUID, DEFAULT_DEVICE_NAME, SERVICE_UUID},
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Device information service, exposed next to the serial service.
const DEVICE_INFO_SERVICE: ShortUuid = ShortUuid::new(0x180A);

/// Characteristic that exists on the serial service but is never used.
const CONFIG_CHARACTERISTIC: ShortUuid = ShortUuid::new(0xFFE2);

/// Injected misbehavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimFault {
    /// Every connect attempt fails.
    RefuseConnect,
    /// The serial service is absent.
    MissingService,
    /// The serial characteristic is absent.
    MissingCharacteristic,
    /// The link drops after this many notifications per connection.
    DropAfter(usize),
}

/// Simulated peripheral configuration.
#[derive(Debug, Clone)]
pub struct SimPeripheralConfig {
    /// Advertised local name.
    pub name: String,
    /// Transport identity.
    pub id: PeripheralId,
    /// Serial service.
    pub service: ShortUuid,
    /// Serial characteristic.
    pub characteristic: ShortUuid,
    /// Delay before the peripheral answers a command.
    pub latency: Duration,
    /// Upper bound on notification payload size in bytes.
    pub max_chunk: usize,
    /// Other advertisers seen during a scan.
    pub decoys: Vec<(PeripheralId, Option<String>)>,
    /// Text sent once notifications are enabled. `None` for silence.
    pub banner: Option<String>,
    /// Injected fault. `None` for a well-behaved device.
    pub fault: Option<SimFault>,
    /// RNG seed for fragmentation and telemetry.
    pub seed: u64,
}

impl Default for SimPeripheralConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DEVICE_NAME.to_string(),
            id: PeripheralId(0x4855),
            service: SERVICE_UUID,
            characteristic: CHARACTERISTIC_UUID,
            latency: Duration::from_millis(20),
            max_chunk: 20,
            decoys: vec![
                (PeripheralId(0x0101), Some("Thermostat".to_string())),
                (PeripheralId(0x0102), None),
                (PeripheralId(0x0103), Some("houston".to_string())),
            ],
            banner: Some("HOUSTON ready\r\n".to_string()),
            fault: None,
            seed: 0,
        }
    }
}

/// An event the peripheral wants delivered `after` the current time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduled {
    /// Delay relative to the caller's clock.
    pub after: Duration,
    /// Event to deliver.
    pub event: TransportEvent,
}

/// Simulated peripheral state machine.
#[derive(Debug, Clone)]
pub struct SimPeripheral {
    config: SimPeripheralConfig,
    rng: ChaCha8Rng,
    powered: bool,
    scanning: bool,
    connected: bool,
    subscribed: bool,
    /// Notifications sent on the current connection.
    notifications: usize,
    /// Writes received over the peripheral's lifetime.
    writes: Vec<Vec<u8>>,
}

impl SimPeripheral {
    /// Create a powered-off peripheral.
    pub fn new(config: SimPeripheralConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            powered: false,
            scanning: false,
            connected: false,
            subscribed: false,
            notifications: 0,
            writes: Vec::new(),
        }
    }

    /// Radio comes up.
    pub fn power_on(&mut self) -> Vec<Scheduled> {
        self.powered = true;
        vec![self.after(self.config.latency, TransportEvent::PoweredOn)]
    }

    /// Radio goes away, taking any connection with it.
    pub fn power_off(&mut self) -> Vec<Scheduled> {
        self.powered = false;
        self.scanning = false;
        self.disconnect();
        vec![self.after(Duration::ZERO, TransportEvent::PoweredOff)]
    }

    /// Drop the connection from the peripheral side.
    pub fn drop_link(&mut self) -> Vec<Scheduled> {
        if !self.connected {
            return vec![];
        }
        self.disconnect();
        vec![self.after(Duration::ZERO, TransportEvent::Disconnected { peripheral: self.config.id })]
    }

    /// Emit one telemetry line, if a subscriber is listening.
    pub fn telemetry(&mut self) -> Vec<Scheduled> {
        if !self.subscribed {
            return vec![];
        }
        let tenths: u32 = self.rng.gen_range(180..260);
        let humidity: u32 = self.rng.gen_range(30..70);
        let line = format!("temp={}.{} hum={humidity}\r\n", tenths / 10, tenths % 10);
        self.notify(line.as_bytes())
    }

    /// React to a command from the central.
    pub fn handle(&mut self, command: &TransportCommand) -> Vec<Scheduled> {
        if !self.powered {
            return vec![];
        }

        match command {
            TransportCommand::Scan { service } => {
                self.scanning = true;
                self.advertise(*service)
            },
            TransportCommand::StopScan => {
                self.scanning = false;
                vec![]
            },
            TransportCommand::Connect { peripheral } => {
                let id = *peripheral;
                if id != self.config.id || self.config.fault == Some(SimFault::RefuseConnect) {
                    return vec![self.after(self.config.latency, TransportEvent::ConnectFailed {
                        peripheral: id,
                    })];
                }
                self.connected = true;
                self.notifications = 0;
                vec![self.after(self.config.latency, TransportEvent::Connected { peripheral: id })]
            },
            TransportCommand::DiscoverServices { peripheral, services } => {
                if !self.owns(*peripheral) {
                    return vec![];
                }
                let mut offered = vec![DEVICE_INFO_SERVICE];
                if self.config.fault != Some(SimFault::MissingService) {
                    offered.push(self.config.service);
                }
                let services = filtered(offered, services);
                vec![self.after(self.config.latency, TransportEvent::ServicesFound {
                    peripheral: *peripheral,
                    services,
                })]
            },
            TransportCommand::DiscoverCharacteristics { service, characteristics } => {
                if !self.owns(service.peripheral) {
                    return vec![];
                }
                let mut offered = vec![CONFIG_CHARACTERISTIC];
                if service.uuid == self.config.service
                    && self.config.fault != Some(SimFault::MissingCharacteristic)
                {
                    offered.push(self.config.characteristic);
                }
                let characteristics = filtered(offered, characteristics);
                vec![self.after(self.config.latency, TransportEvent::CharacteristicsFound {
                    service: *service,
                    characteristics,
                })]
            },
            TransportCommand::Subscribe { characteristic } => {
                if !self.owns(characteristic.peripheral())
                    || *characteristic != self.characteristic()
                {
                    return vec![];
                }
                self.subscribed = true;
                match self.config.banner.clone() {
                    Some(banner) => self.notify(banner.as_bytes()),
                    None => vec![],
                }
            },
            TransportCommand::Write { characteristic, value } => {
                if !self.owns(characteristic.peripheral()) {
                    return vec![self.after(Duration::ZERO, TransportEvent::WriteFailed {
                        characteristic: *characteristic,
                    })];
                }
                self.writes.push(value.clone());
                let mut echo = value.clone();
                echo.extend_from_slice(b"\r\n");
                self.notify(&echo)
            },
        }
    }

    /// Advertisements for one scan: decoys first, then the device itself.
    fn advertise(&mut self, service: ShortUuid) -> Vec<Scheduled> {
        let mut out = Vec::new();
        let mut delay = Duration::ZERO;

        let decoys = self.config.decoys.clone();
        for (peripheral, name) in decoys {
            delay += self.jitter();
            out.push(self.after(delay, TransportEvent::Discovered { peripheral, name }));
        }

        if service == self.config.service {
            delay += self.jitter();
            out.push(self.after(delay, TransportEvent::Discovered {
                peripheral: self.config.id,
                name: Some(self.config.name.clone()),
            }));
        }
        out
    }

    /// Cut `bytes` into randomly sized notifications.
    ///
    /// With [`SimFault::DropAfter`], the connection is dropped as soon as the
    /// limit is reached; the rest of the payload is lost.
    fn notify(&mut self, bytes: &[u8]) -> Vec<Scheduled> {
        let characteristic = self.characteristic();
        let mut out = Vec::new();
        let mut delay = Duration::ZERO;
        let mut rest = bytes;

        while !rest.is_empty() && self.connected {
            let max = self.config.max_chunk.clamp(1, rest.len());
            let len = self.rng.gen_range(1..=max);
            let (chunk, tail) = rest.split_at(len);
            rest = tail;

            delay += self.jitter();
            out.push(self.after(delay, TransportEvent::ValueUpdated {
                characteristic,
                value: chunk.to_vec(),
            }));
            self.notifications += 1;

            if let Some(SimFault::DropAfter(limit)) = self.config.fault
                && self.notifications >= limit
            {
                tracing::debug!(limit, "simulated peripheral dropping link");
                self.disconnect();
                out.push(self.after(delay, TransportEvent::Disconnected {
                    peripheral: self.config.id,
                }));
            }
        }
        out
    }

    fn jitter(&mut self) -> Duration {
        let max = self.config.latency.as_millis().max(1) as u64;
        Duration::from_millis(self.rng.gen_range(1..=max))
    }

    fn disconnect(&mut self) {
        self.connected = false;
        self.subscribed = false;
    }

    fn owns(&self, peripheral: PeripheralId) -> bool {
        self.connected && peripheral == self.config.id
    }

    fn after(&self, after: Duration, event: TransportEvent) -> Scheduled {
        Scheduled { after, event }
    }

    /// Handle of the serial characteristic.
    pub fn characteristic(&self) -> CharacteristicHandle {
        CharacteristicHandle {
            service: ServiceHandle { peripheral: self.config.id, uuid: self.config.service },
            uuid: self.config.characteristic,
        }
    }

    /// Configuration.
    pub fn config(&self) -> &SimPeripheralConfig {
        &self.config
    }

    /// True between a scan request and the matching stop.
    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    /// True while a central is connected.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// True while notifications are enabled.
    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Every payload written to the peripheral, oldest first.
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }
}

/// Discovery honors the central's filter; an empty filter returns everything.
fn filtered(offered: Vec<ShortUuid>, filter: &[ShortUuid]) -> Vec<ShortUuid> {
    if filter.is_empty() {
        return offered;
    }
    offered.into_iter().filter(|uuid| filter.contains(uuid)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(scheduled: Vec<Scheduled>) -> Vec<TransportEvent> {
        scheduled.into_iter().map(|s| s.event).collect()
    }

    fn connected(config: SimPeripheralConfig) -> SimPeripheral {
        let id = config.id;
        let mut peripheral = SimPeripheral::new(config);
        peripheral.power_on();
        peripheral.handle(&TransportCommand::Connect { peripheral: id });
        peripheral
    }

    #[test]
    fn ignores_commands_while_powered_off() {
        let mut peripheral = SimPeripheral::new(SimPeripheralConfig::default());
        assert!(peripheral.handle(&TransportCommand::Scan { service: SERVICE_UUID }).is_empty());
    }

    #[test]
    fn scan_advertises_decoys_then_device() {
        let mut peripheral = SimPeripheral::new(SimPeripheralConfig::default());
        peripheral.power_on();

        let scheduled = peripheral.handle(&TransportCommand::Scan { service: SERVICE_UUID });
        assert_eq!(scheduled.len(), 4);
        assert!(scheduled.windows(2).all(|w| w[0].after <= w[1].after));
        assert_eq!(scheduled.last().map(|s| &s.event), Some(&TransportEvent::Discovered {
            peripheral: PeripheralId(0x4855),
            name: Some("Houston".to_string()),
        }));
    }

    #[test]
    fn refuse_connect_fault() {
        let config =
            SimPeripheralConfig { fault: Some(SimFault::RefuseConnect), ..Default::default() };
        let id = config.id;
        let mut peripheral = SimPeripheral::new(config);
        peripheral.power_on();

        let out = events(peripheral.handle(&TransportCommand::Connect { peripheral: id }));
        assert_eq!(out, [TransportEvent::ConnectFailed { peripheral: id }]);
        assert!(!peripheral.is_connected());
    }

    #[test]
    fn missing_service_fault_filters_discovery() {
        let config =
            SimPeripheralConfig { fault: Some(SimFault::MissingService), ..Default::default() };
        let id = config.id;
        let mut peripheral = connected(config);

        let out = events(peripheral.handle(&TransportCommand::DiscoverServices {
            peripheral: id,
            services: vec![SERVICE_UUID],
        }));
        assert_eq!(out, [TransportEvent::ServicesFound { peripheral: id, services: vec![] }]);
    }

    #[test]
    fn write_is_echoed_in_fragments() {
        let mut peripheral = connected(SimPeripheralConfig { banner: None, ..Default::default() });
        let characteristic = peripheral.characteristic();
        peripheral.handle(&TransportCommand::Subscribe { characteristic });

        let scheduled = peripheral
            .handle(&TransportCommand::Write { characteristic, value: b"hello world".to_vec() });

        let chunks: Vec<_> = scheduled
            .iter()
            .filter_map(|s| match &s.event {
                TransportEvent::ValueUpdated { value, .. } => Some(value.as_slice()),
                _ => None,
            })
            .collect();
        assert_eq!(chunks.len(), scheduled.len());
        assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= 20));
        assert_eq!(chunks.concat(), b"hello world\r\n");
        assert_eq!(peripheral.writes(), [b"hello world".to_vec()]);
    }

    #[test]
    fn drop_after_fault_disconnects() {
        let config = SimPeripheralConfig {
            fault: Some(SimFault::DropAfter(2)),
            max_chunk: 1,
            ..Default::default()
        };
        let mut peripheral = connected(config);
        let characteristic = peripheral.characteristic();

        let out = events(peripheral.handle(&TransportCommand::Subscribe { characteristic }));
        assert_eq!(out.len(), 3);
        assert!(matches!(out.last(), Some(TransportEvent::Disconnected { .. })));
        assert!(!peripheral.is_connected());
    }

    #[test]
    fn same_seed_same_fragmentation() {
        let run = || {
            let mut peripheral = connected(SimPeripheralConfig { seed: 9, ..Default::default() });
            let characteristic = peripheral.characteristic();
            peripheral.handle(&TransportCommand::Subscribe { characteristic })
        };
        assert_eq!(run(), run());
    }
}
