//! Fuzz target for the link state machine
//!
//! Radio events arrive in any order, from any device (HIGH priority)
//!
//! # Strategy
//!
//! - Arbitrary event sequences: power changes, advertisements, discovery
//!   results, notifications and disconnects for a handful of device ids
//! - Retry timers: stale and current tokens fire at arbitrary times
//! - Submissions interleaved with radio events
//!
//! # Invariants
//!
//! - Handles exist exactly while the state holds a peripheral
//! - A retry is armed exactly while the link is `Failed` with the radio on
//! - Writes are only issued while `Ready`
//! - NEVER panic on out-of-order events

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use houston_core::{
    CharacteristicHandle, Link, LinkAction, LinkConfig, LinkEvent, LinkState, PeripheralId,
    RetryToken, ServiceHandle, ShortUuid, TransportCommand, TransportEvent,
    config::{CHARACTERISTIC_UUID, SERVICE_UUID},
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    PoweredOn,
    PoweredOff,
    Discovered { device: u8, named: bool },
    Connected { device: u8 },
    ConnectFailed { device: u8 },
    Disconnected { device: u8 },
    ServicesFound { device: u8, present: bool },
    CharacteristicsFound { device: u8, present: bool },
    ValueUpdated { device: u8, bytes: Vec<u8> },
    RetryElapsed { token: u8 },
    Submit { text: String },
}

fn id(device: u8) -> PeripheralId {
    PeripheralId(u64::from(device % 4))
}

fn uuid_if(present: bool, wanted: ShortUuid) -> Vec<ShortUuid> {
    if present { vec![wanted] } else { vec![] }
}

fn characteristic(device: u8) -> CharacteristicHandle {
    CharacteristicHandle {
        service: ServiceHandle { peripheral: id(device), uuid: SERVICE_UUID },
        uuid: CHARACTERISTIC_UUID,
    }
}

fn to_event(op: Op) -> Option<LinkEvent> {
    let event = match op {
        Op::PoweredOn => TransportEvent::PoweredOn,
        Op::PoweredOff => TransportEvent::PoweredOff,
        Op::Discovered { device, named } => TransportEvent::Discovered {
            peripheral: id(device),
            name: named.then(|| "Houston".to_string()),
        },
        Op::Connected { device } => TransportEvent::Connected { peripheral: id(device) },
        Op::ConnectFailed { device } => TransportEvent::ConnectFailed { peripheral: id(device) },
        Op::Disconnected { device } => TransportEvent::Disconnected { peripheral: id(device) },
        Op::ServicesFound { device, present } => TransportEvent::ServicesFound {
            peripheral: id(device),
            services: uuid_if(present, SERVICE_UUID),
        },
        Op::CharacteristicsFound { device, present } => TransportEvent::CharacteristicsFound {
            service: characteristic(device).service,
            characteristics: uuid_if(present, CHARACTERISTIC_UUID),
        },
        Op::ValueUpdated { device, bytes } => {
            TransportEvent::ValueUpdated { characteristic: characteristic(device), value: bytes }
        },
        Op::RetryElapsed { token } => {
            return Some(LinkEvent::RetryElapsed { token: RetryToken(u64::from(token % 8)) });
        },
        Op::Submit { .. } => return None,
    };
    Some(LinkEvent::Transport(event))
}

fuzz_target!(|ops: Vec<Op>| {
    let mut link: Link<Duration> = Link::new(LinkConfig::default());
    let mut now = Duration::ZERO;

    for op in ops {
        now += Duration::from_millis(250);
        let was_ready = link.is_ready();

        let actions = match op {
            Op::Submit { text } => link.submit(&text),
            op => match to_event(op) {
                Some(event) => link.handle(event, now),
                None => continue,
            },
        };

        for action in &actions {
            if let LinkAction::Transport(TransportCommand::Write { .. }) = action {
                assert!(was_ready, "write issued while not ready");
            }
        }

        let state = link.state();
        assert_eq!(link.peripheral().is_some(), state.holds_peripheral());
        assert_eq!(link.characteristic().is_some(), *state == LinkState::Ready);
        assert_eq!(
            link.pending_retry().is_some(),
            matches!(state, LinkState::Failed(_)) && link.is_powered()
        );
    }
});
