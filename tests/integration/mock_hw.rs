//! Mock adapters for integration tests.
//!
//! Records every actuator call, event and history row so tests can
//! assert on the full interaction without touching GPIO or files.

use std::cell::{Cell, RefCell};

use furnace::app::events::AppEvent;
use furnace::app::ports::{ActuatorPort, Clock, EventSink, ReadingLog, ReadingRecord, SensorPort, SettingsStore};
use furnace::error::{Result, StorageError};
use furnace::fsm::Regime;
use furnace::sensors::{ChannelKind, FURNACE_CHANNEL, Reading, ReadingSource};
use furnace::settings::ControlSettings;
use furnace::state::{ActuatorSet, SystemState, Timestamp};

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorCall {
    Apply { set: ActuatorSet, drum_step_rate: u32 },
    AllOff,
    Release,
}

// ── MockHardware ──────────────────────────────────────────────

/// Sensor + actuator mock.  Every channel reports as hardware with the
/// value currently configured.
pub struct MockHardware {
    pub channels: Vec<(String, ChannelKind, f64)>,
    pub calls: Vec<ActuatorCall>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn with_furnace(temp: f64) -> Self {
        Self {
            channels: vec![
                (FURNACE_CHANNEL.to_owned(), ChannelKind::Temperature, temp),
                ("Pressão Gases".to_owned(), ChannelKind::Pressure, 2.0),
            ],
            calls: Vec::new(),
        }
    }

    pub fn set_furnace(&mut self, temp: f64) {
        for ch in &mut self.channels {
            if ch.0 == FURNACE_CHANNEL {
                ch.2 = temp;
            }
        }
    }

    pub fn remove_furnace(&mut self) {
        self.channels.retain(|ch| ch.0 != FURNACE_CHANNEL);
    }

    pub fn last_applied(&self) -> Option<ActuatorSet> {
        self.calls.iter().rev().find_map(|c| match c {
            ActuatorCall::Apply { set, .. } => Some(*set),
            _ => None,
        })
    }
}

impl SensorPort for MockHardware {
    fn read_all(&mut self, now: Timestamp) -> Vec<Reading> {
        self.channels
            .iter()
            .map(|(id, kind, value)| Reading {
                channel_id: id.clone(),
                kind: *kind,
                value: *value,
                source: ReadingSource::Hardware,
                timestamp: now,
            })
            .collect()
    }
}

impl ActuatorPort for MockHardware {
    fn apply(&mut self, set: &ActuatorSet, drum_step_rate: u32) {
        self.calls.push(ActuatorCall::Apply {
            set: *set,
            drum_step_rate,
        });
    }

    fn all_off(&mut self) {
        self.calls.push(ActuatorCall::AllOff);
    }

    fn release(&mut self) {
        self.calls.push(ActuatorCall::Release);
    }
}

// ── MockSettingsStore ─────────────────────────────────────────

#[derive(Default)]
pub struct MockSettingsStore {
    pub stored: RefCell<Option<ControlSettings>>,
    pub saves: Cell<usize>,
    pub fail_saves: Cell<bool>,
}

#[allow(dead_code)]
impl MockSettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let store = Self::default();
        store.fail_saves.set(true);
        store
    }
}

impl SettingsStore for MockSettingsStore {
    fn load(&self) -> Result<ControlSettings> {
        Ok(self.stored.borrow().clone().unwrap_or_default())
    }

    fn save(&self, settings: &ControlSettings) -> Result<()> {
        if self.fail_saves.get() {
            return Err(StorageError::Io(std::io::ErrorKind::PermissionDenied).into());
        }
        *self.stored.borrow_mut() = Some(settings.clone());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<&SystemState> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::Snapshot(s) => Some(s.as_ref()),
                _ => None,
            })
            .collect()
    }

    pub fn regime_changes(&self) -> Vec<(Option<Regime>, Regime)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::RegimeChanged { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── VecReadingLog ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct LoggedRow {
    pub channel: String,
    pub value: f64,
    pub source: ReadingSource,
    pub at: Timestamp,
}

#[derive(Default)]
pub struct VecReadingLog {
    pub rows: Vec<LoggedRow>,
    pub fail: bool,
}

#[allow(dead_code)]
impl VecReadingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows_for(&self, channel: &str) -> usize {
        self.rows.iter().filter(|r| r.channel == channel).count()
    }
}

impl ReadingLog for VecReadingLog {
    fn append(&mut self, record: &ReadingRecord<'_>) -> core::result::Result<(), StorageError> {
        if self.fail {
            return Err(StorageError::Io(std::io::ErrorKind::Other));
        }
        self.rows.push(LoggedRow {
            channel: record.channel_id.to_owned(),
            value: record.value,
            source: record.source,
            at: record.timestamp,
        });
        Ok(())
    }
}

// ── SteppingClock ─────────────────────────────────────────────

/// Clock that advances by a fixed step on every read.
pub struct SteppingClock {
    now: Cell<u64>,
    step_ms: u64,
}

#[allow(dead_code)]
impl SteppingClock {
    pub fn new(step_ms: u64) -> Self {
        Self {
            now: Cell::new(0),
            step_ms,
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> Timestamp {
        let t = self.now.get();
        self.now.set(t + self.step_ms);
        Timestamp::from_millis(t)
    }
}
