//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the [`SystemState`] aggregate and the regime
//! tracker.  It exposes a hardware-agnostic API; all I/O flows through
//! port traits injected at call sites, so the whole service is testable
//! with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                 │       AppService        │
//! ActuatorPort ◀──│  SystemState · FSM      │ ──▶ ReadingLog
//!                 └────────────────────────┘
//!                            ▲ │
//!        InboundCommand ─────┘ └────▶ SettingsStore
//! ```

use std::collections::HashMap;

use log::{debug, error, info, warn};
use serde_json::Value;

use crate::error::Result;
use crate::fsm::{Fsm, Regime};
use crate::settings::{ControlSettings, SystemMode};
use crate::state::{Actuator, SystemState, Timers, Timestamp};

use super::commands::{CommandOutcome, IgnoreReason, InboundCommand};
use super::events::AppEvent;
use super::ports::{ActuatorPort, EventSink, ReadingLog, ReadingRecord, SensorPort, SettingsStore};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService {
    state: SystemState,
    fsm: Fsm,
    log_throttle: ReadingLogThrottle,
    tick_count: u64,
}

impl AppService {
    /// Construct the service from loaded settings.
    ///
    /// `reading_log_interval_ms` bounds how often each channel is
    /// appended to the reading log.
    pub fn new(settings: ControlSettings, reading_log_interval_ms: u64) -> Self {
        Self {
            state: SystemState::new(settings),
            fsm: Fsm::new(),
            log_throttle: ReadingLogThrottle::new(reading_log_interval_ms),
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, hardware_channels: usize, sink: &mut impl EventSink) {
        let mode = self.state.settings.system_mode;
        info!(
            "AppService started: mode={:?}, heating={}, {} hardware channel(s)",
            mode, self.state.settings.heating_enabled, hardware_channels
        );
        sink.emit(&AppEvent::Started {
            mode,
            hardware_channels,
        });
    }

    /// Drive every output off, then release them.  The order is fixed.
    pub fn shutdown(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        info!("Shutting down after {} ticks: outputs off, then release", self.tick_count);
        hw.all_off();
        hw.release();
        sink.emit(&AppEvent::Stopped);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle: acquire → decide → broadcast → actuate → log.
    ///
    /// `hw` implements both [`SensorPort`] and [`ActuatorPort`], so one
    /// exclusive borrow covers the whole tick.
    pub fn tick(
        &mut self,
        now: Timestamp,
        hw: &mut (impl SensorPort + ActuatorPort),
        sink: &mut impl EventSink,
        log: &mut impl ReadingLog,
    ) {
        self.tick_count += 1;

        // 1. Acquire
        let readings = hw.read_all(now);
        self.state.merge_readings(&readings);

        // 2. Decide (automatic mode only)
        match self.state.settings.system_mode {
            SystemMode::Automatic => {
                let out = self.fsm.step(
                    &self.state.settings,
                    &self.state.values,
                    &self.state.actuators,
                    &self.state.timers,
                    now,
                );
                self.state.actuators = out.actuators;
                self.state.timers = out.timers;
                if let Some((from, to)) = out.transition {
                    sink.emit(&AppEvent::RegimeChanged { from, to });
                }
            }
            SystemMode::Manual => self.fsm.suspend(),
        }

        // 3. Broadcast
        sink.emit(&self.snapshot());

        // 4. Actuate
        hw.apply(&self.state.actuators, self.state.settings.drum_step_rate);

        // 5. History, rate-limited per channel; failures never stop the loop
        for reading in &readings {
            if !self.log_throttle.admit(&reading.channel_id, now) {
                continue;
            }
            if let Err(e) = log.append(&ReadingRecord::from(reading)) {
                warn!("Reading log append failed for '{}': {}", reading.channel_id, e);
            }
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply one inbound command.
    ///
    /// Errors are returned only for `SET_SETTING`: an ill-typed value
    /// (nothing changed) or a failed save (the in-memory change stays).
    pub fn handle_command(
        &mut self,
        cmd: InboundCommand,
        store: &impl SettingsStore,
        sink: &mut impl EventSink,
    ) -> Result<CommandOutcome> {
        match cmd {
            InboundCommand::SetSetting { name, value } => {
                self.apply_setting(&name, &value, store, sink)?;
                Ok(CommandOutcome::Applied)
            }
            InboundCommand::ManualControl { target, state } => {
                Ok(self.manual_control(&target, state, sink))
            }
            InboundCommand::RequestFullUpdate => {
                debug!("Full update requested");
                sink.emit(&self.snapshot());
                Ok(CommandOutcome::Broadcast)
            }
        }
    }

    /// Merge one setting, then persist the whole document synchronously.
    /// Timers are cleared whenever heating ends up disabled.
    pub fn apply_setting(
        &mut self,
        name: &str,
        value: &Value,
        store: &impl SettingsStore,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        if let Err(e) = self.state.settings.apply(name, value) {
            warn!("SET_SETTING '{}' = {} rejected: {}", name, value, e);
            return Err(e.into());
        }
        info!("SET_SETTING '{}' = {}", name, value);
        if !self.state.settings.heating_enabled {
            // Disarmed even in manual mode, where the state machine won't run.
            self.state.timers = Timers::IDLE;
        }

        let saved = store.save(&self.state.settings);
        if let Err(e) = saved {
            error!("Setting '{}' applied in memory but not persisted: {}", name, e);
        }
        sink.emit(&AppEvent::SettingChanged {
            name: name.to_owned(),
            persisted: saved.is_ok(),
        });
        saved
    }

    /// Set one output by name.  A no-op unless the system is in manual mode.
    pub fn manual_control(&mut self, target: &str, on: bool, sink: &mut impl EventSink) -> CommandOutcome {
        let reason = if self.state.settings.system_mode != SystemMode::Manual {
            IgnoreReason::NotInManualMode
        } else if let Some(which) = Actuator::from_name(target) {
            self.state.actuators.set(which, on);
            info!("MANUAL_CONTROL {} -> {}", which, if on { "on" } else { "off" });
            return CommandOutcome::Applied;
        } else {
            IgnoreReason::UnknownTarget
        };

        warn!("MANUAL_CONTROL '{}' ignored: {}", target, reason);
        sink.emit(&AppEvent::CommandIgnored {
            target: target.to_owned(),
            reason,
        });
        CommandOutcome::Ignored(reason)
    }

    // ── Queries ───────────────────────────────────────────────

    /// Read-only view of the aggregate.
    pub fn state(&self) -> &SystemState {
        &self.state
    }

    /// An owned copy of the aggregate, wrapped for broadcast.
    pub fn snapshot(&self) -> AppEvent {
        AppEvent::Snapshot(Box::new(self.state.clone()))
    }

    /// Regime of the last automatic tick (`None` in manual mode).
    pub fn regime(&self) -> Option<Regime> {
        self.fsm.current_regime()
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

// ───────────────────────────────────────────────────────────────
// Reading log throttle
// ───────────────────────────────────────────────────────────────

/// Admits each channel at most once per interval.
pub struct ReadingLogThrottle {
    interval_ms: u64,
    last: HashMap<String, Timestamp>,
}

impl ReadingLogThrottle {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last: HashMap::new(),
        }
    }

    pub fn admit(&mut self, channel: &str, now: Timestamp) -> bool {
        match self.last.get_mut(channel) {
            Some(last) if now.millis_since(*last) < self.interval_ms => false,
            Some(last) => {
                *last = now;
                true
            }
            None => {
                self.last.insert(channel.to_owned(), now);
                true
            }
        }
    }
}
