//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (channel bank, GPIO outputs, settings file, reading
//! log, event transports) implement these traits.  The
//! [`AppService`](super::service::AppService) consumes them via generics,
//! so the domain core never touches hardware or files directly.

use crate::error::{Result, StorageError};
use crate::sensors::{ChannelBank, ChannelKind, Reading, ReadingSource};
use crate::settings::ControlSettings;
use crate::state::{ActuatorSet, Timestamp};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this once per tick.
pub trait SensorPort {
    /// One reading per configured channel.  Never fails; hardware faults
    /// surface only as `ReadingSource::Simulated`.
    fn read_all(&mut self, now: Timestamp) -> Vec<Reading>;
}

impl SensorPort for ChannelBank {
    fn read_all(&mut self, now: Timestamp) -> Vec<Reading> {
        ChannelBank::read_all(self, now)
    }
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port.  Values are logical (`true` = on); polarity is the
/// adapter's concern.
pub trait ActuatorPort {
    /// Drive every output to match `set`.  `drum_step_rate` is the pulse
    /// rate to use while `set.drum_pulse` is on.
    fn apply(&mut self, set: &ActuatorSet, drum_step_rate: u32);

    /// Drive every output to its safe (off) electrical state.
    fn all_off(&mut self);

    /// Hand the outputs back to the OS.  Only called after [`all_off`](Self::all_off).
    fn release(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → observers)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

/// Fan an event out to two sinks, in order.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &super::events::AppEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Settings store (driven adapter: domain ↔ persisted settings)
// ───────────────────────────────────────────────────────────────

/// Whole-document persistence of [`ControlSettings`].
pub trait SettingsStore {
    /// Load the persisted settings.  Returns [`ControlSettings::default()`]
    /// if nothing has been persisted yet; a document that exists but
    /// cannot be parsed is an error.
    fn load(&self) -> Result<ControlSettings>;

    /// Overwrite the persisted document.  Must not return before the
    /// write is complete.
    fn save(&self, settings: &ControlSettings) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Reading log (driven adapter: domain → history)
// ───────────────────────────────────────────────────────────────

/// One row of the reading history.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ReadingRecord<'a> {
    #[serde(rename = "channel")]
    pub channel_id: &'a str,
    pub value: f64,
    pub kind: ChannelKind,
    pub source: ReadingSource,
    #[serde(skip)]
    pub timestamp: Timestamp,
}

impl<'a> From<&'a Reading> for ReadingRecord<'a> {
    fn from(r: &'a Reading) -> Self {
        Self {
            channel_id: &r.channel_id,
            value: r.value,
            kind: r.kind,
            source: r.source,
            timestamp: r.timestamp,
        }
    }
}

/// Append-only history of readings.
pub trait ReadingLog {
    fn append(&mut self, record: &ReadingRecord<'_>) -> core::result::Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

/// Monotonic time source for timers.
pub trait Clock {
    fn now(&self) -> Timestamp;
}
