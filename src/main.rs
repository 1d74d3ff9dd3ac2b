//! Biomass furnace controller: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  RigHardware        LogEventSink    JsonSettingsStore        │
//! │  (Sensor+Actuator)  JsonLinesSink   JsonlReadingLog          │
//! │  MonotonicClock     stdin reader ──▶ CommandQueue            │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ──────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │          AppService (pure logic) · FSM             │      │
//! │  └────────────────────────────────────────────────────┘      │
//! │                                                              │
//! │  ControlLoop (fixed tick, safe shutdown)                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use log::info;

use furnace::adapters::hardware::{RigHardware, SimulatedActuators};
use furnace::adapters::json_store::JsonSettingsStore;
use furnace::adapters::log_sink::LogEventSink;
use furnace::adapters::reading_log::JsonlReadingLog;
use furnace::adapters::stdio_transport::{JsonLinesSink, spawn_stdin_reader};
use furnace::adapters::time::MonotonicClock;
use furnace::app::ports::{ActuatorPort, SettingsStore};
use furnace::app::queue::CommandQueue;
use furnace::app::service::AppService;
use furnace::config::RigConfig;
use furnace::driver::ControlLoop;
use furnace::sensors::ChannelBank;

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("╔══════════════════════════════════════╗");
    info!("║  Furnace controller v{}           ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Deployment config ──────────────────────────────────
    let config = RigConfig::from_env().context("loading rig configuration")?;
    info!(
        "Config: tick={}ms hardware={} settings={} readings={}",
        config.tick_interval_ms,
        config.hardware,
        config.settings_path.display(),
        config.readings_path.display()
    );

    // ── 3. Shutdown signal ────────────────────────────────────
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .context("installing SIGINT/SIGTERM handler")?;
    }

    // ── 4. Persisted settings (malformed document is fatal) ───
    let store = JsonSettingsStore::new(config.settings_path.clone());
    let settings = store
        .load()
        .with_context(|| format!("loading settings from {}", config.settings_path.display()))?;

    // ── 5. Channels ───────────────────────────────────────────
    let mut bank = ChannelBank::new(ChannelBank::rig_channels(config.simulation_amplitude));

    // ── 6. Transport + history ────────────────────────────────
    let queue = Arc::new(CommandQueue::new());
    spawn_stdin_reader(Arc::clone(&queue)).context("spawning command reader")?;
    let sink = (LogEventSink::new(), JsonLinesSink::new(std::io::stdout()));
    let readings = JsonlReadingLog::open(&config.readings_path)
        .with_context(|| format!("opening reading log {}", config.readings_path.display()))?;

    let service = AppService::new(settings, config.reading_log_interval_ms());

    // ── 7. Outputs + loop ─────────────────────────────────────
    if config.hardware {
        let (actuators, working) = hardware::bring_up(&config, &mut bank)?;
        run(&config, &stop, service, RigHardware::new(bank, actuators), sink, store, readings, queue, working);
    } else {
        info!("Simulation mode: all channels simulated, outputs in memory");
        let hw = RigHardware::new(bank, SimulatedActuators::new());
        run(&config, &stop, service, hw, sink, store, readings, queue, 0);
    }

    info!("Exited cleanly");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run<A: ActuatorPort>(
    config: &RigConfig,
    stop: &AtomicBool,
    service: AppService,
    hw: RigHardware<A>,
    sink: impl furnace::app::ports::EventSink,
    store: JsonSettingsStore,
    readings: impl furnace::app::ports::ReadingLog,
    queue: Arc<CommandQueue>,
    hardware_channels: usize,
) {
    let mut control = ControlLoop::new(
        service,
        hw,
        sink,
        store,
        readings,
        MonotonicClock::new(),
        queue,
        config.tick_interval_ms,
    );
    control.run(stop, hardware_channels);
}

#[cfg(feature = "rpi")]
mod hardware {
    use anyhow::{Context, Result};
    use log::info;

    use furnace::adapters::hardware::GpioActuators;
    use furnace::adapters::rpi::RpiPeripherals;
    use furnace::adapters::time::StdDelay;
    use furnace::config::RigConfig;
    use furnace::sensors::ChannelBank;
    use furnace::sensors::probe::validate_all;

    /// Claim outputs (safe state first), bind transducers, then probe.
    /// Zero working channels is fatal.
    pub fn bring_up(
        config: &RigConfig,
        bank: &mut ChannelBank,
    ) -> Result<(GpioActuators<rppal::gpio::OutputPin, StdDelay>, usize)> {
        let rpi = RpiPeripherals::open().context("opening Raspberry Pi peripherals")?;
        let actuators = rpi.actuators(config).context("claiming output pins")?;
        let bound = rpi.bind_transducers(config, bank).context("binding transducers")?;
        info!("{} transducer(s) bound, probing", bound);
        let report = validate_all(bank.channels_mut(), config.probe_policy(), &mut StdDelay)
            .context("startup hardware validation")?;
        Ok((actuators, report.working()))
    }
}

#[cfg(not(feature = "rpi"))]
mod hardware {
    use anyhow::{Result, bail};

    use furnace::adapters::hardware::SimulatedActuators;
    use furnace::config::RigConfig;
    use furnace::sensors::ChannelBank;

    pub fn bring_up(_config: &RigConfig, _bank: &mut ChannelBank) -> Result<(SimulatedActuators, usize)> {
        bail!("hardware mode requested but this build has no `rpi` feature")
    }
}
