//! End-to-end simulation: the production runtime against the simulated
//! peripheral on virtual time.
//!
//! # Oracle Pattern
//!
//! Each test ends with oracle checks that verify:
//! - the final link state and status text
//! - the transcript as the user would see it
//! - zero invariant violations over the whole run

use std::time::Duration;

use houston_app::{App, Runtime};
use houston_core::{LinkConfig, LinkState, TransportCommand};
use houston_harness::{InvariantRegistry, SimDriver, SimInstant, SimPeripheralConfig};

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

async fn simulate(
    config: SimPeripheralConfig,
    script: impl FnOnce(&mut SimDriver),
) -> (App<SimInstant>, SimDriver) {
    let mut driver = SimDriver::new(config)
        .with_invariants(InvariantRegistry::standard())
        .with_deadline(Duration::from_secs(30));
    script(&mut driver);

    let mut runtime = Runtime::new(driver, LinkConfig::default());
    runtime.run().await.expect("simulation should not error");
    let (app, driver) = runtime.into_parts();

    assert!(driver.is_stopped());
    assert!(driver.violations().is_empty(), "violations: {:?}", driver.violations());
    (app, driver)
}

#[tokio::test]
async fn connects_past_decoys_and_shows_banner() {
    let (app, driver) = simulate(SimPeripheralConfig::default(), |d| {
        d.power_on_at(ms(0));
    })
    .await;

    assert_eq!(app.link_state(), &LinkState::Ready);
    assert_eq!(app.status(), "Connected");

    let connects: Vec<_> = driver
        .commands()
        .iter()
        .filter(|c| matches!(c, TransportCommand::Connect { .. }))
        .collect();
    assert_eq!(connects.len(), 1);

    insta::assert_snapshot!(driver.last_frame(), @"<< HOUSTON ready");
}

#[tokio::test]
async fn echo_round_trip() {
    let (app, driver) = simulate(SimPeripheralConfig { banner: None, ..Default::default() }, |d| {
        d.power_on_at(ms(0)).type_line_at(ms(2000), "status").type_line_at(ms(4000), "reset");
    })
    .await;

    assert!(app.link().is_ready());
    assert_eq!(driver.peripheral().writes(), [b"status".to_vec(), b"reset".to_vec()]);
    insta::assert_snapshot!(app.transcript().render(), @r"
    >> status
    << status
    >> reset
    << reset
    ");
}

#[tokio::test]
async fn telemetry_lines_stay_whole() {
    let (app, _) = simulate(SimPeripheralConfig { banner: None, seed: 3, ..Default::default() }, |d| {
        d.power_on_at(ms(0));
        for second in 1..=5 {
            d.telemetry_at(Duration::from_secs(second));
        }
    })
    .await;

    assert_eq!(app.transcript().len(), 5);
    for line in app.transcript().lines() {
        assert!(line.text.starts_with("temp="), "fragmented line: {:?}", line.text);
        assert!(line.text.contains(" hum="), "fragmented line: {:?}", line.text);
    }
}

#[tokio::test]
async fn typing_before_connection_is_marked_failed() {
    let (app, driver) = simulate(SimPeripheralConfig { banner: None, ..Default::default() }, |d| {
        d.type_line_at(ms(0), "too early").power_on_at(ms(10));
    })
    .await;

    assert!(app.link().is_ready());
    assert!(driver.peripheral().writes().is_empty());
    insta::assert_snapshot!(app.transcript().render(), @"x> too early");
}

#[tokio::test]
async fn dropped_link_recovers_after_cooldown() {
    let (app, driver) = simulate(SimPeripheralConfig { banner: None, ..Default::default() }, |d| {
        d.power_on_at(ms(0)).drop_link_at(ms(1000)).type_line_at(ms(1500), "lost");
    })
    .await;

    assert_eq!(app.link_state(), &LinkState::Ready);
    let scans =
        driver.commands().iter().filter(|c| matches!(c, TransportCommand::Scan { .. })).count();
    assert_eq!(scans, 2);
    insta::assert_snapshot!(app.transcript().render(), @"x> lost");
}

#[tokio::test]
async fn power_off_halts_until_power_returns() {
    let (app, driver) = simulate(SimPeripheralConfig { banner: None, ..Default::default() }, |d| {
        d.power_on_at(ms(0)).power_off_at(ms(1000));
    })
    .await;

    assert_eq!(app.link_state(), &LinkState::Idle);
    assert_eq!(app.status(), "Bluetooth is not available");
    let scans =
        driver.commands().iter().filter(|c| matches!(c, TransportCommand::Scan { .. })).count();
    assert_eq!(scans, 1);
}

#[tokio::test]
async fn same_seed_same_run() {
    let run = || {
        simulate(SimPeripheralConfig { seed: 11, ..Default::default() }, |d| {
            d.power_on_at(ms(0)).telemetry_at(ms(1000)).type_line_at(ms(1500), "x");
        })
    };

    let (first, first_driver) = run().await;
    let (second, second_driver) = run().await;

    assert_eq!(first.transcript().render(), second.transcript().render());
    assert_eq!(first_driver.commands(), second_driver.commands());
}
