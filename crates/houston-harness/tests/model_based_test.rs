//! Randomized simulation runs.
//!
//! Arbitrary schedules of radio power changes, link drops, telemetry and
//! typing, against peripherals with arbitrary faults. Whatever happens, the
//! standard invariants must hold after every render.

use std::time::Duration;

use houston_app::{KeyInput, Runtime};
use houston_core::{LinkConfig, Origin, TransportCommand};
use houston_harness::{InvariantRegistry, SimDriver, SimFault, SimPeripheralConfig};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    PowerOn,
    PowerOff,
    DropLink,
    Telemetry,
    Type(String),
    Key(KeyInput),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => Just(Op::PowerOn),
        1 => Just(Op::PowerOff),
        2 => Just(Op::DropLink),
        4 => Just(Op::Telemetry),
        4 => "[a-z ]{1,12}".prop_map(Op::Type),
        2 => prop_oneof![
            Just(KeyInput::Left),
            Just(KeyInput::Backspace),
            Just(KeyInput::Char('q')),
            Just(KeyInput::Enter),
        ]
        .prop_map(Op::Key),
    ]
}

fn fault_strategy() -> impl Strategy<Value = SimFault> {
    prop_oneof![
        Just(SimFault::RefuseConnect),
        Just(SimFault::MissingService),
        Just(SimFault::MissingCharacteristic),
        (1usize..6).prop_map(SimFault::DropAfter),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_invariants_hold_under_random_schedules(
        seed in any::<u64>(),
        fault in prop::option::of(fault_strategy()),
        ops in prop::collection::vec((0u64..20_000, op_strategy()), 0..40),
    ) {
        let config = SimPeripheralConfig { seed, fault, ..Default::default() };
        let mut driver = SimDriver::new(config)
            .with_invariants(InvariantRegistry::standard())
            .with_deadline(Duration::from_secs(30));
        driver.power_on_at(Duration::ZERO);

        for (at, op) in ops {
            let at = Duration::from_millis(at);
            match op {
                Op::PowerOn => driver.power_on_at(at),
                Op::PowerOff => driver.power_off_at(at),
                Op::DropLink => driver.drop_link_at(at),
                Op::Telemetry => driver.telemetry_at(at),
                Op::Type(text) => driver.type_line_at(at, &text),
                Op::Key(key) => driver.key_at(at, key),
            };
        }

        let rt = tokio::runtime::Builder::new_current_thread().build().expect("runtime");
        let mut runtime = Runtime::new(driver, LinkConfig { max_lines: 8, ..LinkConfig::default() });
        rt.block_on(runtime.run()).expect("simulation should not error");
        let (app, driver) = runtime.into_parts();

        prop_assert!(driver.violations().is_empty(), "violations: {:?}", driver.violations());
        prop_assert!(app.transcript().len() <= 8);

        // Every write the runtime issued was echoed in the transcript as sent.
        let writes = driver
            .commands()
            .iter()
            .filter(|c| matches!(c, TransportCommand::Write { .. }))
            .count();
        let sent = app.transcript().lines().filter(|l| l.origin == Origin::OutboundOk).count();
        prop_assert!(sent <= writes);
    }
}
