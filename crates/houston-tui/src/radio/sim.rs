//! Simulated radio.
//!
//! Runs a [`SimPeripheral`] on the radio task. Its events come back after the
//! peripheral's simulated latency.

use std::{collections::VecDeque, time::Duration};

use houston_core::{TransportCommand, TransportEvent};
use houston_harness::{Scheduled, SimPeripheral};
use tokio::{
    sync::mpsc,
    time::{Instant, Interval, MissedTickBehavior},
};

/// Run the peripheral, bridging between channels and its scheduled events.
pub(super) async fn run(
    mut peripheral: SimPeripheral,
    telemetry_every: Option<Duration>,
    mut commands: mpsc::Receiver<TransportCommand>,
    events: mpsc::Sender<TransportEvent>,
) {
    let mut pending = VecDeque::new();
    enqueue(&mut pending, Instant::now(), peripheral.power_on());

    let mut telemetry = telemetry_every.map(|every| {
        let mut interval = tokio::time::interval_at(Instant::now() + every, every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    loop {
        let next_due = pending.front().map(|(at, _)| *at);

        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                tracing::trace!(?command, "radio command");
                let scheduled = peripheral.handle(&command);
                enqueue(&mut pending, Instant::now(), scheduled);
            }

            () = tokio::time::sleep_until(next_due.unwrap_or_else(Instant::now)), if next_due.is_some() => {
                if let Some((_, event)) = pending.pop_front()
                    && events.send(event).await.is_err()
                {
                    break;
                }
            }

            () = next_tick(telemetry.as_mut()) => {
                let scheduled = peripheral.telemetry();
                enqueue(&mut pending, Instant::now(), scheduled);
            }
        }
    }

    tracing::debug!("simulated radio stopped");
}

/// Insert scheduled events into the pending queue, keeping it sorted by due
/// time. Events due at the same instant keep their scheduling order.
fn enqueue(
    pending: &mut VecDeque<(Instant, TransportEvent)>,
    now: Instant,
    scheduled: Vec<Scheduled>,
) {
    for Scheduled { after, event } in scheduled {
        let at = now + after;
        let index = pending.partition_point(|(due, _)| *due <= at);
        pending.insert(index, (at, event));
    }
}

async fn next_tick(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        },
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use houston_core::{
        CharacteristicHandle, PeripheralId, ServiceHandle,
        config::{CHARACTERISTIC_UUID, SERVICE_UUID},
    };

    use houston_harness::SimPeripheralConfig;

    use super::*;
    use crate::RadioHandle;

    fn quiet_config() -> SimPeripheralConfig {
        SimPeripheralConfig {
            latency: Duration::from_millis(1),
            decoys: vec![],
            banner: None,
            ..SimPeripheralConfig::default()
        }
    }

    #[tokio::test]
    async fn radio_powers_on_at_start() {
        let mut radio = RadioHandle::simulated(quiet_config(), None);
        assert_eq!(radio.events.recv().await, Some(TransportEvent::PoweredOn));
        radio.stop();
    }

    #[tokio::test]
    async fn scan_finds_the_device() {
        let config = quiet_config();
        let id = config.id;
        let service = config.service;
        let mut radio = RadioHandle::simulated(config, None);
        assert_eq!(radio.events.recv().await, Some(TransportEvent::PoweredOn));

        radio.commands.send(TransportCommand::Scan { service }).await.expect("send");
        assert_eq!(
            radio.events.recv().await,
            Some(TransportEvent::Discovered { peripheral: id, name: Some("Houston".into()) })
        );
        radio.stop();
    }

    #[tokio::test]
    async fn write_to_unknown_characteristic_fails() {
        let mut radio = RadioHandle::simulated(quiet_config(), None);
        assert_eq!(radio.events.recv().await, Some(TransportEvent::PoweredOn));

        let characteristic = CharacteristicHandle {
            service: ServiceHandle { peripheral: PeripheralId(99), uuid: SERVICE_UUID },
            uuid: CHARACTERISTIC_UUID,
        };
        radio
            .commands
            .send(TransportCommand::Write { characteristic, value: b"hi".to_vec() })
            .await
            .expect("send");

        assert_eq!(radio.events.recv().await, Some(TransportEvent::WriteFailed { characteristic }));
        radio.stop();
    }

    #[test]
    fn enqueue_keeps_due_order() {
        let now = Instant::now();
        let mut pending = VecDeque::new();
        enqueue(&mut pending, now, vec![Scheduled {
            after: Duration::from_millis(20),
            event: TransportEvent::PoweredOff,
        }]);
        enqueue(&mut pending, now, vec![
            Scheduled { after: Duration::from_millis(10), event: TransportEvent::PoweredOn },
            Scheduled { after: Duration::from_millis(20), event: TransportEvent::PoweredOn },
        ]);

        let order: Vec<_> = pending.into_iter().map(|(_, event)| event).collect();
        assert_eq!(order, [
            TransportEvent::PoweredOn,
            TransportEvent::PoweredOff,
            TransportEvent::PoweredOn
        ]);
    }
}
