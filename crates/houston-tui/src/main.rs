//! Houston terminal binary.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a real module (build with --features bluetooth)
//! houston --device-name HMSoft
//!
//! # A module with a non-default UART service
//! houston --service FFF0 --characteristic FFF1
//!
//! # Talk to the simulated Houston peripheral
//! houston --simulate
//!
//! # Log link transitions to a file
//! houston --simulate --log-file houston.log --log-level debug
//!
//! # Exercise the retry path
//! houston --simulate --fault refuse-connect
//! houston --simulate --drop-after 12
//! ```

use std::{error::Error, fs::File, sync::Mutex, time::Duration};

use clap::{Parser, ValueEnum};
use houston_core::{
    LinkConfig, ShortUuid,
    config::{DEFAULT_DEVICE_NAME, DEFAULT_MAX_LINES},
};
use houston_harness::{SimFault, SimPeripheralConfig};
use houston_tui::{RadioHandle, Runtime, TerminalDriver};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Fault injected into the simulated peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Fault {
    /// Every connect attempt fails.
    RefuseConnect,
    /// The serial service is never offered.
    MissingService,
    /// The serial characteristic is never offered.
    MissingCharacteristic,
}

/// Houston BLE serial terminal
#[derive(Parser, Debug)]
#[command(name = "houston")]
#[command(about = "Line-oriented terminal for a serial-over-BLE peripheral")]
#[command(version)]
struct Args {
    /// Advertised name of the device to connect to
    #[arg(short, long, default_value = DEFAULT_DEVICE_NAME)]
    device_name: String,

    /// 16-bit UUID of the serial service (hex)
    #[arg(long, default_value = "FFE0")]
    service: ShortUuid,

    /// 16-bit UUID of the serial characteristic (hex)
    #[arg(long, default_value = "FFE1")]
    characteristic: ShortUuid,

    /// Transcript capacity in lines
    #[arg(long, default_value_t = DEFAULT_MAX_LINES)]
    max_lines: usize,

    /// Write logs to this file (the terminal is taken by the UI)
    #[arg(long)]
    log_file: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Talk to an in-process simulated peripheral instead of the adapter
    #[arg(long)]
    simulate: bool,

    /// Seed for the simulated peripheral. Random if not given.
    #[arg(long, requires = "simulate")]
    seed: Option<u64>,

    /// Fault to inject into the simulated peripheral
    #[arg(long, value_enum, requires = "simulate")]
    fault: Option<Fault>,

    /// Drop the link after this many notifications
    #[arg(long, conflicts_with = "fault", requires = "simulate")]
    drop_after: Option<usize>,

    /// Telemetry period of the simulated peripheral in milliseconds (0
    /// disables telemetry)
    #[arg(long, default_value_t = 2000)]
    telemetry_ms: u64,
}

impl Args {
    fn link_config(&self) -> LinkConfig {
        LinkConfig {
            device_name: self.device_name.clone(),
            service: self.service,
            characteristic: self.characteristic,
            max_lines: self.max_lines,
            ..LinkConfig::default()
        }
    }

    fn sim_fault(&self) -> Option<SimFault> {
        match (self.fault, self.drop_after) {
            (Some(Fault::RefuseConnect), _) => Some(SimFault::RefuseConnect),
            (Some(Fault::MissingService), _) => Some(SimFault::MissingService),
            (Some(Fault::MissingCharacteristic), _) => Some(SimFault::MissingCharacteristic),
            (None, Some(limit)) => Some(SimFault::DropAfter(limit)),
            (None, None) => None,
        }
    }

    /// Simulated peripheral advertising what the link looks for.
    fn sim_peripheral(&self, seed: u64) -> SimPeripheralConfig {
        SimPeripheralConfig {
            name: self.device_name.clone(),
            service: self.service,
            characteristic: self.characteristic,
            fault: self.sim_fault(),
            seed,
            ..SimPeripheralConfig::default()
        }
    }
}

#[cfg(feature = "bluetooth")]
#[allow(clippy::unnecessary_wraps)]
fn bluetooth_radio() -> Result<RadioHandle, Box<dyn Error>> {
    tracing::info!("using the host Bluetooth adapter");
    Ok(RadioHandle::bluetooth())
}

#[cfg(not(feature = "bluetooth"))]
fn bluetooth_radio() -> Result<RadioHandle, Box<dyn Error>> {
    Err("built without Bluetooth support: pass --simulate or rebuild with --features bluetooth"
        .into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    if let Some(path) = &args.log_file {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
        let file = File::create(path)?;

        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
            .with(filter)
            .init();
    }

    tracing::info!(
        device = %args.device_name,
        service = %args.service,
        characteristic = %args.characteristic,
        "Houston starting"
    );

    let radio = if args.simulate {
        let seed = args.seed.unwrap_or_else(rand::random);
        let peripheral = args.sim_peripheral(seed);
        tracing::info!(seed, "using the simulated peripheral");
        if let Some(fault) = &peripheral.fault {
            tracing::warn!(?fault, "simulated peripheral will misbehave");
        }

        let telemetry = (args.telemetry_ms > 0).then(|| Duration::from_millis(args.telemetry_ms));
        RadioHandle::simulated(peripheral, telemetry)
    } else {
        bluetooth_radio()?
    };

    let driver = TerminalDriver::new(radio)?;
    let mut runtime = Runtime::new(driver, args.link_config());

    runtime.run().await?;

    tracing::info!("Houston stopped");
    Ok(())
}
