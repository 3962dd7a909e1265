//! Radio transport boundary.
//!
//! The core never talks to a BLE stack. It emits [`TransportCommand`]s and
//! consumes [`TransportEvent`]s; a driver maps these onto whatever radio API
//! the platform provides (or onto the simulated peripheral in tests).
//!
//! All commands are fire-and-forget. Their outcome, if any, arrives later as
//! a separate event.

use crate::uuid::ShortUuid;

/// Opaque identity the transport assigns to an advertising device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeripheralId(pub u64);

impl std::fmt::Display for PeripheralId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:04x}", self.0)
    }
}

/// The one discovered device selected by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheralHandle {
    /// Transport-assigned identity.
    pub id: PeripheralId,
    /// Advertised local name at discovery time.
    pub name: String,
}

/// A service on a connected peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceHandle {
    /// Owning peripheral.
    pub peripheral: PeripheralId,
    /// Service identifier.
    pub uuid: ShortUuid,
}

/// The notification/write characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacteristicHandle {
    /// Service the characteristic belongs to.
    pub service: ServiceHandle,
    /// Characteristic identifier.
    pub uuid: ShortUuid,
}

impl CharacteristicHandle {
    /// Owning peripheral.
    pub fn peripheral(&self) -> PeripheralId {
        self.service.peripheral
    }
}

/// Requests issued to the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    /// Start scanning for devices advertising `service`.
    Scan {
        /// Service filter.
        service: ShortUuid,
    },

    /// Stop an active scan.
    StopScan,

    /// Connect to a discovered device.
    Connect {
        /// Device to connect to.
        peripheral: PeripheralId,
    },

    /// Discover services, restricted to `services`.
    DiscoverServices {
        /// Connected device.
        peripheral: PeripheralId,
        /// Service filter.
        services: Vec<ShortUuid>,
    },

    /// Discover characteristics of `service`, restricted to `characteristics`.
    DiscoverCharacteristics {
        /// Service to inspect.
        service: ServiceHandle,
        /// Characteristic filter.
        characteristics: Vec<ShortUuid>,
    },

    /// Enable notifications on a characteristic.
    Subscribe {
        /// Characteristic to subscribe to.
        characteristic: CharacteristicHandle,
    },

    /// Write without response.
    Write {
        /// Target characteristic.
        characteristic: CharacteristicHandle,
        /// Raw bytes to write.
        value: Vec<u8>,
    },
}

/// Events delivered by the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Radio is powered on and usable.
    PoweredOn,

    /// Radio is powered off, unauthorized or otherwise unavailable.
    PoweredOff,

    /// Advertisement received during a scan.
    Discovered {
        /// Advertising device.
        peripheral: PeripheralId,
        /// Advertised local name, if the advertisement carried one.
        name: Option<String>,
    },

    /// Connect request succeeded.
    Connected {
        /// Connected device.
        peripheral: PeripheralId,
    },

    /// Connect request failed.
    ConnectFailed {
        /// Device that could not be connected.
        peripheral: PeripheralId,
    },

    /// Established connection was lost.
    Disconnected {
        /// Device that went away.
        peripheral: PeripheralId,
    },

    /// Service discovery finished.
    ServicesFound {
        /// Inspected device.
        peripheral: PeripheralId,
        /// Services found (may be empty).
        services: Vec<ShortUuid>,
    },

    /// Characteristic discovery finished.
    CharacteristicsFound {
        /// Inspected service.
        service: ServiceHandle,
        /// Characteristics found (may be empty).
        characteristics: Vec<ShortUuid>,
    },

    /// Notification received.
    ValueUpdated {
        /// Notifying characteristic.
        characteristic: CharacteristicHandle,
        /// Raw notification payload.
        value: Vec<u8>,
    },

    /// A write without response could not be queued.
    WriteFailed {
        /// Characteristic the write targeted.
        characteristic: CharacteristicHandle,
    },
}

impl TransportEvent {
    /// Peripheral the event refers to. `None` for radio-wide events.
    pub fn peripheral(&self) -> Option<PeripheralId> {
        match self {
            Self::PoweredOn | Self::PoweredOff => None,
            Self::Discovered { peripheral, .. }
            | Self::Connected { peripheral }
            | Self::ConnectFailed { peripheral }
            | Self::Disconnected { peripheral }
            | Self::ServicesFound { peripheral, .. } => Some(*peripheral),
            Self::CharacteristicsFound { service, .. } => Some(service.peripheral),
            Self::ValueUpdated { characteristic, .. } | Self::WriteFailed { characteristic } => {
                Some(characteristic.peripheral())
            },
        }
    }
}
