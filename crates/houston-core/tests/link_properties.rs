//! Property-based tests for the link state machine's retry policy.

use std::time::Instant;

use houston_core::{
    Link, LinkAction, LinkConfig, LinkEvent, LinkState, PeripheralId, RetryToken, ServiceHandle,
    TransportCommand, TransportEvent,
    config::{CHARACTERISTIC_UUID, SERVICE_UUID},
};
use proptest::prelude::*;

const DEVICE: PeripheralId = PeripheralId(5);

/// Steps a well-behaved or failing peripheral could take.
#[derive(Debug, Clone)]
enum Step {
    Advertise,
    Connect,
    RefuseConnect,
    Services(bool),
    Characteristics(bool),
    Disconnect,
    PowerOff,
    PowerOn,
    /// Fire the most recently armed retry timer.
    FireRetry,
    /// Fire a timer that was never armed.
    FireBogus,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => Just(Step::Advertise),
        3 => Just(Step::Connect),
        1 => Just(Step::RefuseConnect),
        3 => any::<bool>().prop_map(Step::Services),
        3 => any::<bool>().prop_map(Step::Characteristics),
        1 => Just(Step::Disconnect),
        1 => Just(Step::PowerOff),
        1 => Just(Step::PowerOn),
        3 => Just(Step::FireRetry),
        1 => Just(Step::FireBogus),
    ]
}

fn event(step: &Step, armed: Option<RetryToken>) -> Option<LinkEvent> {
    let service = ServiceHandle { peripheral: DEVICE, uuid: SERVICE_UUID };
    let event = match step {
        Step::Advertise => {
            TransportEvent::Discovered { peripheral: DEVICE, name: Some("Houston".into()) }
        },
        Step::Connect => TransportEvent::Connected { peripheral: DEVICE },
        Step::RefuseConnect => TransportEvent::ConnectFailed { peripheral: DEVICE },
        Step::Services(ok) => TransportEvent::ServicesFound {
            peripheral: DEVICE,
            services: if *ok { vec![SERVICE_UUID] } else { vec![] },
        },
        Step::Characteristics(ok) => TransportEvent::CharacteristicsFound {
            service,
            characteristics: if *ok { vec![CHARACTERISTIC_UUID] } else { vec![] },
        },
        Step::Disconnect => TransportEvent::Disconnected { peripheral: DEVICE },
        Step::PowerOff => TransportEvent::PoweredOff,
        Step::PowerOn => TransportEvent::PoweredOn,
        Step::FireRetry => return armed.map(|token| LinkEvent::RetryElapsed { token }),
        Step::FireBogus => return Some(LinkEvent::RetryElapsed { token: RetryToken(u64::MAX) }),
    };
    Some(LinkEvent::Transport(event))
}

proptest! {
    #[test]
    fn prop_each_failure_rescans_at_most_once(
        steps in prop::collection::vec(step_strategy(), 0..120),
    ) {
        let now = Instant::now();
        let mut link: Link = Link::new(LinkConfig::default());
        let _ = link.handle(TransportEvent::PoweredOn.into(), now);

        let mut armed: Option<RetryToken> = None;
        let mut fired = Vec::new();

        for step in &steps {
            let Some(event) = event(step, armed) else { continue };
            let fired_token = match &event {
                LinkEvent::RetryElapsed { token } => Some(*token),
                LinkEvent::Transport(_) => None,
            };

            let actions = link.handle(event, now);
            let scanned = actions
                .iter()
                .any(|a| matches!(a, LinkAction::Transport(TransportCommand::Scan { .. })));

            if let Some(token) = fired_token
                && scanned
            {
                prop_assert!(!fired.contains(&token), "token {token:?} rescanned twice");
                fired.push(token);
            }

            for action in &actions {
                match action {
                    LinkAction::ScheduleRetry { token, .. } => armed = Some(*token),
                    LinkAction::CancelRetry { token } => {
                        prop_assert_eq!(armed, Some(*token));
                        armed = None;
                    },
                    _ => {},
                }
            }

            let failed = matches!(link.state(), LinkState::Failed(_));
            prop_assert_eq!(link.pending_retry().is_some(), failed);
            if let Some(pending) = link.pending_retry() {
                prop_assert_eq!(Some(pending), armed);
            }
            if failed {
                prop_assert!(link.peripheral().is_none());
                prop_assert!(link.characteristic().is_none());
            }
        }
    }
}
