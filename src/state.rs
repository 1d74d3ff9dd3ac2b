//! The canonical system aggregate and its building blocks.
//!
//! [`SystemState`] is owned exclusively by the control loop; everything
//! outside the loop only ever sees a cloned snapshot.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sensors::{Reading, ReadingSource};
use crate::settings::ControlSettings;

// ---------------------------------------------------------------------------
// Monotonic time
// ---------------------------------------------------------------------------

/// Milliseconds on the process-local monotonic clock.
///
/// Only differences between two timestamps are meaningful; the origin is
/// whatever the [`Clock`](crate::app::ports::Clock) adapter chose at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Self = Self(0);

    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(secs * 1000)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Milliseconds elapsed since `earlier`, saturating at zero.
    pub const fn millis_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    #[must_use]
    pub const fn plus_millis(self, ms: u64) -> Self {
        Self(self.0.saturating_add(ms))
    }
}

// ---------------------------------------------------------------------------
// Actuators
// ---------------------------------------------------------------------------

/// Identity of one actuator output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actuator {
    Blower,
    Resistor,
    Auger,
    DrumDirection,
    DrumPulse,
}

impl Actuator {
    pub const ALL: [Self; 5] = [
        Self::Blower,
        Self::Resistor,
        Self::Auger,
        Self::DrumDirection,
        Self::DrumPulse,
    ];

    /// Resolve a `MANUAL_CONTROL` target name.
    ///
    /// Accepts the canonical snake_case names as well as the field names
    /// used by the rig's operator panel.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "blower" | "ventilador" => Some(Self::Blower),
            "resistor" | "resistencia" => Some(Self::Resistor),
            "auger" | "motor_rosca" => Some(Self::Auger),
            "drum_direction" | "tambor_dir" => Some(Self::DrumDirection),
            "drum_pulse" | "tambor_pul" => Some(Self::DrumPulse),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Blower => "blower",
            Self::Resistor => "resistor",
            Self::Auger => "auger",
            Self::DrumDirection => "drum_direction",
            Self::DrumPulse => "drum_pulse",
        }
    }
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Logical on/off state of every output.  `true` always means "on";
/// electrical polarity is the actuation adapter's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActuatorSet {
    pub blower: bool,
    pub resistor: bool,
    pub auger: bool,
    /// `true` = drum turns forward.
    pub drum_direction: bool,
    /// `true` = stepper pulse train running.
    pub drum_pulse: bool,
}

impl ActuatorSet {
    /// Every output off: the safe electrical state.
    pub const fn all_off() -> Self {
        Self {
            blower: false,
            resistor: false,
            auger: false,
            drum_direction: false,
            drum_pulse: false,
        }
    }

    pub fn get(&self, which: Actuator) -> bool {
        match which {
            Actuator::Blower => self.blower,
            Actuator::Resistor => self.resistor,
            Actuator::Auger => self.auger,
            Actuator::DrumDirection => self.drum_direction,
            Actuator::DrumPulse => self.drum_pulse,
        }
    }

    pub fn set(&mut self, which: Actuator, on: bool) {
        match which {
            Actuator::Blower => self.blower = on,
            Actuator::Resistor => self.resistor = on,
            Actuator::Auger => self.auger = on,
            Actuator::DrumDirection => self.drum_direction = on,
            Actuator::DrumPulse => self.drum_pulse = on,
        }
    }

    /// Switch off the three outputs governed by the heating policy.
    /// Drum outputs are left as they are.
    pub fn heating_off(&mut self) {
        self.blower = false;
        self.resistor = false;
        self.auger = false;
    }
}

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

/// Episode timers of the automatic policy.  `None` = not running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timers {
    pub resistor_start: Option<Timestamp>,
    pub auger_cycle_start: Option<Timestamp>,
}

impl Timers {
    pub const IDLE: Self = Self {
        resistor_start: None,
        auger_cycle_start: None,
    };

    pub fn is_idle(&self) -> bool {
        self.resistor_start.is_none() && self.auger_cycle_start.is_none()
    }
}

// ---------------------------------------------------------------------------
// SystemState
// ---------------------------------------------------------------------------

/// The canonical aggregate broadcast to observers after every tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemState {
    pub settings: ControlSettings,
    /// Latest value per channel id.
    pub values: BTreeMap<String, f64>,
    /// Where each value in `values` came from this tick.
    pub sources: BTreeMap<String, ReadingSource>,
    pub actuators: ActuatorSet,
    pub timers: Timers,
}

impl SystemState {
    pub fn new(settings: ControlSettings) -> Self {
        Self {
            settings,
            values: BTreeMap::new(),
            sources: BTreeMap::new(),
            actuators: ActuatorSet::all_off(),
            timers: Timers::IDLE,
        }
    }

    /// Replace the value table with this tick's readings.
    ///
    /// Channels that produced nothing this tick disappear from the table,
    /// so an absent value always means "absent this tick".
    pub fn merge_readings(&mut self, readings: &[Reading]) {
        self.values.clear();
        self.sources.clear();
        for r in readings {
            self.values.insert(r.channel_id.clone(), r.value);
            self.sources.insert(r.channel_id.clone(), r.source);
        }
    }
}
