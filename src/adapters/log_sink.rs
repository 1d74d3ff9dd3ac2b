//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade.  Snapshots arrive every tick, so they go out at
//! `debug`; everything else is `info`/`warn`.

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::fsm::furnace_temperature;
use crate::sensors::ReadingSource;

/// Adapter that logs every [`AppEvent`].
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn on_off(v: bool) -> &'static str {
    if v { "ON" } else { "off" }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Snapshot(s) => {
                let furnace = furnace_temperature(&s.values)
                    .map(|t| format!("{:.1}\u{00b0}C", t))
                    .unwrap_or_else(|| "n/a".to_owned());
                let hw = s.sources.values().filter(|src| **src == ReadingSource::Hardware).count();
                debug!(
                    "SNAP | mode={:?} heating={} | T_furnace={} | blower={} resistor={} \
                     auger={} drum_dir={} drum_pul={} | hw={}/{}",
                    s.settings.system_mode,
                    on_off(s.settings.heating_enabled),
                    furnace,
                    on_off(s.actuators.blower),
                    on_off(s.actuators.resistor),
                    on_off(s.actuators.auger),
                    on_off(s.actuators.drum_direction),
                    on_off(s.actuators.drum_pulse),
                    hw,
                    s.sources.len(),
                );
            }
            AppEvent::RegimeChanged { from, to } => match from {
                Some(from) => info!("REGIME | {:?} -> {:?}", from, to),
                None => info!("REGIME | -> {:?}", to),
            },
            AppEvent::SettingChanged { name, persisted: true } => {
                info!("SETTING | {} saved", name);
            }
            AppEvent::SettingChanged { name, persisted: false } => {
                warn!("SETTING | {} applied but NOT saved", name);
            }
            AppEvent::CommandIgnored { target, reason } => {
                info!("IGNORED | MANUAL_CONTROL {}: {}", target, reason);
            }
            AppEvent::Started { mode, hardware_channels } => {
                info!("START | mode={:?} hardware_channels={}", mode, hardware_channels);
            }
            AppEvent::Stopped => {
                info!("STOP | outputs off and released");
            }
        }
    }
}
