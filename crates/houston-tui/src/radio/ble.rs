//! Bluetooth radio backed by the host adapter.
//!
//! Translates [`TransportCommand`]s into btleplug calls and adapter events
//! back into [`TransportEvent`]s. The link knows peripherals by a numeric
//! [`PeripheralId`] handed out the first time the adapter reports them.
//!
//! Connect and discovery run on their own tasks so a slow peripheral never
//! stalls scanning or writes. Writes run inline to keep their order.

use std::{collections::HashMap, hash::Hash};

use btleplug::{
    api::{
        Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter,
        WriteType, bleuuid::uuid_from_u16,
    },
    platform::{self, Adapter, Manager, Peripheral},
};
use futures::StreamExt;
use houston_core::{
    CharacteristicHandle, PeripheralId, ShortUuid, TransportCommand, TransportEvent,
};
use tokio::{
    sync::mpsc::{self, error::SendError},
    task::AbortHandle,
};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

type SendResult = Result<(), SendError<TransportEvent>>;

/// Run the adapter, bridging between channels and btleplug.
pub(super) async fn run(
    mut commands: mpsc::Receiver<TransportCommand>,
    events: mpsc::Sender<TransportEvent>,
) {
    let adapter = match first_adapter().await {
        Ok(Some(adapter)) => adapter,
        Ok(None) => {
            warn!("no Bluetooth adapter found");
            return unavailable(commands, events).await;
        },
        Err(e) => {
            warn!(error = %e, "Bluetooth manager unavailable");
            return unavailable(commands, events).await;
        },
    };

    let mut central = match adapter.events().await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "adapter events unavailable");
            return unavailable(commands, events).await;
        },
    };

    if events.send(TransportEvent::PoweredOn).await.is_err() {
        return;
    }
    info!("Bluetooth adapter ready");

    let mut radio = BleRadio::new(adapter, events);
    loop {
        let result = tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                trace!(?command, "radio command");
                radio.execute(command).await
            }

            event = central.next() => {
                let Some(event) = event else {
                    warn!("adapter event stream ended");
                    break;
                };
                radio.on_central_event(event).await
            }
        };

        if result.is_err() {
            break;
        }
    }

    debug!("Bluetooth radio stopped");
}

async fn first_adapter() -> btleplug::Result<Option<Adapter>> {
    let manager = Manager::new().await?;
    Ok(manager.adapters().await?.into_iter().next())
}

/// Report the radio as off and swallow commands until the link goes away.
async fn unavailable(
    mut commands: mpsc::Receiver<TransportCommand>,
    events: mpsc::Sender<TransportEvent>,
) {
    if events.send(TransportEvent::PoweredOff).await.is_err() {
        return;
    }
    while let Some(command) = commands.recv().await {
        trace!(?command, "dropping command, no adapter");
    }
}

/// Live adapter state owned by the radio task.
struct BleRadio {
    adapter: Adapter,
    events: mpsc::Sender<TransportEvent>,
    registry: Registry<platform::PeripheralId>,
    /// True between `Scan` and `StopScan`; sightings are only reported then.
    scanning: bool,
    /// Notification forwarder and the peripheral it listens to.
    notifications: Option<(PeripheralId, AbortHandle)>,
}

impl BleRadio {
    fn new(adapter: Adapter, events: mpsc::Sender<TransportEvent>) -> Self {
        Self { adapter, events, registry: Registry::new(), scanning: false, notifications: None }
    }

    async fn execute(&mut self, command: TransportCommand) -> SendResult {
        match command {
            TransportCommand::Scan { service } => {
                self.scanning = true;
                let filter = ScanFilter { services: vec![to_uuid(service)] };
                if let Err(e) = self.adapter.start_scan(filter).await {
                    warn!(error = %e, "scan did not start");
                }
            },

            TransportCommand::StopScan => {
                self.scanning = false;
                if let Err(e) = self.adapter.stop_scan().await {
                    debug!(error = %e, "scan did not stop");
                }
            },

            TransportCommand::Connect { peripheral } => {
                let Some(device) = self.device(peripheral).await else {
                    return self.events.send(TransportEvent::ConnectFailed { peripheral }).await;
                };

                let events = self.events.clone();
                tokio::spawn(async move {
                    let event = match device.connect().await {
                        Ok(()) => TransportEvent::Connected { peripheral },
                        Err(e) => {
                            warn!(%peripheral, error = %e, "connect failed");
                            TransportEvent::ConnectFailed { peripheral }
                        },
                    };
                    let _ = events.send(event).await;
                });
            },

            TransportCommand::DiscoverServices { peripheral, services } => {
                let Some(device) = self.device(peripheral).await else {
                    let event = TransportEvent::ServicesFound { peripheral, services: vec![] };
                    return self.events.send(event).await;
                };

                let events = self.events.clone();
                tokio::spawn(async move {
                    let found = match device.discover_services().await {
                        Ok(()) => device
                            .services()
                            .iter()
                            .filter_map(|service| from_uuid(service.uuid))
                            .filter(|uuid| services.contains(uuid))
                            .collect(),
                        Err(e) => {
                            warn!(%peripheral, error = %e, "service discovery failed");
                            vec![]
                        },
                    };
                    let event = TransportEvent::ServicesFound { peripheral, services: found };
                    let _ = events.send(event).await;
                });
            },

            TransportCommand::DiscoverCharacteristics { service, characteristics } => {
                let found = match self.device(service.peripheral).await {
                    Some(device) => device
                        .services()
                        .iter()
                        .filter(|s| from_uuid(s.uuid) == Some(service.uuid))
                        .flat_map(|s| s.characteristics.iter())
                        .filter_map(|c| from_uuid(c.uuid))
                        .filter(|uuid| characteristics.contains(uuid))
                        .collect(),
                    None => vec![],
                };
                self.events
                    .send(TransportEvent::CharacteristicsFound { service, characteristics: found })
                    .await?;
            },

            TransportCommand::Subscribe { characteristic } => {
                self.stop_notifications();

                let peripheral = characteristic.peripheral();
                let Some(device) = self.device(peripheral).await else {
                    warn!(%peripheral, "subscribe to unknown peripheral");
                    return Ok(());
                };
                let Some(target) = find_characteristic(&device, &characteristic) else {
                    warn!(uuid = %characteristic.uuid, "subscribe to unknown characteristic");
                    return Ok(());
                };

                let events = self.events.clone();
                let task = tokio::spawn(async move {
                    let forwarded =
                        forward_notifications(&device, &target, characteristic, &events).await;
                    if let Err(e) = forwarded {
                        warn!(error = %e, "notifications stopped");
                    }
                });
                self.notifications = Some((peripheral, task.abort_handle()));
            },

            TransportCommand::Write { characteristic, value } => {
                if !self.write(&characteristic, &value).await {
                    self.events.send(TransportEvent::WriteFailed { characteristic }).await?;
                }
            },
        }
        Ok(())
    }

    async fn on_central_event(&mut self, event: CentralEvent) -> SendResult {
        match event {
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id)
                if self.scanning =>
            {
                let peripheral = self.registry.intern(&id);
                let name = match self.adapter.peripheral(&id).await {
                    Ok(device) => {
                        device.properties().await.ok().flatten().and_then(|p| p.local_name)
                    },
                    Err(_) => None,
                };
                self.events.send(TransportEvent::Discovered { peripheral, name }).await?;
            },

            CentralEvent::DeviceDisconnected(id) => {
                if let Some(peripheral) = self.registry.id(&id) {
                    if self.notifications.as_ref().is_some_and(|(owner, _)| *owner == peripheral) {
                        self.stop_notifications();
                    }
                    self.events.send(TransportEvent::Disconnected { peripheral }).await?;
                }
            },

            _ => {},
        }
        Ok(())
    }

    /// Platform peripheral behind `id`. `None` if the adapter forgot it.
    async fn device(&self, id: PeripheralId) -> Option<Peripheral> {
        let key = self.registry.key(id)?;
        match self.adapter.peripheral(key).await {
            Ok(device) => Some(device),
            Err(e) => {
                debug!(peripheral = %id, error = %e, "peripheral lookup failed");
                None
            },
        }
    }

    /// Write without response. `false` if the write could not be queued.
    async fn write(&self, characteristic: &CharacteristicHandle, value: &[u8]) -> bool {
        let Some(device) = self.device(characteristic.peripheral()).await else {
            return false;
        };
        let Some(target) = find_characteristic(&device, characteristic) else {
            return false;
        };
        match device.write(&target, value, WriteType::WithoutResponse).await {
            Ok(()) => true,
            Err(e) => {
                warn!(uuid = %characteristic.uuid, error = %e, "write failed");
                false
            },
        }
    }

    fn stop_notifications(&mut self) {
        if let Some((_, task)) = self.notifications.take() {
            task.abort();
        }
    }
}

impl Drop for BleRadio {
    fn drop(&mut self) {
        self.stop_notifications();
    }
}

/// Subscribe and forward notifications of `characteristic` until the stream
/// or the link goes away.
async fn forward_notifications(
    device: &Peripheral,
    target: &Characteristic,
    characteristic: CharacteristicHandle,
    events: &mpsc::Sender<TransportEvent>,
) -> btleplug::Result<()> {
    let mut stream = device.notifications().await?;
    device.subscribe(target).await?;
    debug!(uuid = %characteristic.uuid, "subscribed");

    while let Some(notification) = stream.next().await {
        if from_uuid(notification.uuid) != Some(characteristic.uuid) {
            continue;
        }
        let event = TransportEvent::ValueUpdated { characteristic, value: notification.value };
        if events.send(event).await.is_err() {
            break;
        }
    }
    Ok(())
}

fn find_characteristic(
    device: &Peripheral,
    characteristic: &CharacteristicHandle,
) -> Option<Characteristic> {
    device.characteristics().into_iter().find(|c| {
        from_uuid(c.service_uuid) == Some(characteristic.service.uuid)
            && from_uuid(c.uuid) == Some(characteristic.uuid)
    })
}

/// Full 128-bit form of a 16-bit identifier.
fn to_uuid(short: ShortUuid) -> Uuid {
    uuid_from_u16(short.to_u16())
}

/// 16-bit form of `uuid`. `None` unless it sits on the Bluetooth base UUID.
fn from_uuid(uuid: Uuid) -> Option<ShortUuid> {
    let short = u16::try_from((uuid.as_u128() >> 96) & 0xFFFF).ok()?;
    let short = ShortUuid::new(short);
    (to_uuid(short) == uuid).then_some(short)
}

/// Stable numeric ids for platform peripheral keys.
#[derive(Debug)]
struct Registry<K> {
    ids: HashMap<K, PeripheralId>,
    keys: HashMap<PeripheralId, K>,
    next: u64,
}

impl<K> Registry<K>
where
    K: Clone + Eq + Hash,
{
    fn new() -> Self {
        Self { ids: HashMap::new(), keys: HashMap::new(), next: 1 }
    }

    /// Id for `key`, assigning the next free one on first sight.
    fn intern(&mut self, key: &K) -> PeripheralId {
        if let Some(id) = self.ids.get(key) {
            return *id;
        }
        let id = PeripheralId(self.next);
        self.next += 1;
        self.ids.insert(key.clone(), id);
        self.keys.insert(id, key.clone());
        id
    }

    fn id(&self, key: &K) -> Option<PeripheralId> {
        self.ids.get(key).copied()
    }

    fn key(&self, id: PeripheralId) -> Option<&K> {
        self.keys.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use houston_core::config::{CHARACTERISTIC_UUID, SERVICE_UUID};

    use super::*;

    #[test]
    fn short_uuid_expands_on_base() {
        let uuid = to_uuid(SERVICE_UUID);
        assert_eq!(uuid.to_string(), "0000ffe0-0000-1000-8000-00805f9b34fb");
        assert_eq!(from_uuid(uuid), Some(SERVICE_UUID));
        assert_eq!(from_uuid(to_uuid(CHARACTERISTIC_UUID)), Some(CHARACTERISTIC_UUID));
    }

    #[test]
    fn vendor_uuid_has_no_short_form() {
        let uuid = Uuid::from_u128(0x6e40_0001_b5a3_f393_e0a9_e50e_24dc_ca9e);
        assert_eq!(from_uuid(uuid), None);
    }

    #[test]
    fn registry_ids_are_stable() {
        let mut registry = Registry::new();
        let first = registry.intern(&"aa:bb");
        let second = registry.intern(&"cc:dd");

        assert_ne!(first, second);
        assert_eq!(registry.intern(&"aa:bb"), first);
        assert_eq!(registry.id(&"cc:dd"), Some(second));
        assert_eq!(registry.key(first), Some(&"aa:bb"));
    }

    #[test]
    fn unknown_id_has_no_key() {
        let registry: Registry<&str> = Registry::new();
        assert_eq!(registry.key(PeripheralId(7)), None);
        assert_eq!(registry.id(&"aa:bb"), None);
    }
}
