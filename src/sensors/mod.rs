//! Sensor subsystem: the per-channel read strategy and the aggregating
//! [`ChannelBank`].
//!
//! Every channel either owns a hardware [`Transducer`] or runs purely on
//! its simulation model.  A hardware-bound channel whose transducer fails
//! or returns an implausible value falls back to simulation for that tick
//! only; the failure never leaves [`SensorChannel::read`].

pub mod pressure;
pub mod probe;
pub mod thermocouple;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::SensorError;
use crate::state::Timestamp;

/// Channel whose temperature drives the automatic heating policy.
pub const FURNACE_CHANNEL: &str = "Temp Forno";

/// Noise amplitude the rig's simulation models are tuned for.
pub const DEFAULT_AMPLITUDE: f64 = 50.0;

// ---------------------------------------------------------------------------
// Channel description
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Temperature,
    Pressure,
    Velocity,
}

impl ChannelKind {
    /// Half-width of the uniform simulation noise for a given amplitude.
    pub fn noise_spread(self, amplitude: f64) -> f64 {
        match self {
            Self::Temperature => amplitude / 10.0,
            Self::Velocity => amplitude * 5.0,
            Self::Pressure => amplitude / 100.0,
        }
    }

    /// Round to the display precision of the unit: 0.1 °C, 0.01 PSI,
    /// whole rpm.
    pub fn round(self, value: f64) -> f64 {
        match self {
            Self::Temperature => (value * 10.0).round() / 10.0,
            Self::Pressure => (value * 100.0).round() / 100.0,
            Self::Velocity => value.round(),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Pressure => "pressure",
            Self::Velocity => "velocity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingSource {
    Hardware,
    Simulated,
}

/// Inclusive plausibility bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidRange {
    pub min: f64,
    pub max: f64,
}

impl ValidRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Pass finite in-range values through, reject everything else.
    pub fn check(&self, value: f64) -> Result<f64, SensorError> {
        if value.is_finite() && value >= self.min && value <= self.max {
            Ok(value)
        } else {
            Err(SensorError::OutOfRange)
        }
    }
}

/// Fallback noise model: `base ± kind.noise_spread(amplitude)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationModel {
    pub base: f64,
    pub amplitude: f64,
}

impl SimulationModel {
    pub fn new(base: f64, amplitude: f64) -> Self {
        Self {
            base,
            amplitude: amplitude.abs(),
        }
    }

    pub fn sample(&self, kind: ChannelKind, rng: &mut impl Rng) -> f64 {
        let spread = kind.noise_spread(self.amplitude);
        let noise = if spread > 0.0 {
            rng.gen_range(-spread..=spread)
        } else {
            0.0
        };
        let raw = self.base + noise;
        let raw = match kind {
            ChannelKind::Temperature => raw,
            ChannelKind::Pressure | ChannelKind::Velocity => raw.max(0.0),
        };
        kind.round(raw)
    }
}

/// One value produced by a channel on one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub channel_id: String,
    pub kind: ChannelKind,
    pub value: f64,
    pub source: ReadingSource,
    pub timestamp: Timestamp,
}

// ---------------------------------------------------------------------------
// Transducers
// ---------------------------------------------------------------------------

/// A physical measurement device.  Implementations must return within a
/// bounded time; a device that would block reports an error instead.
pub trait Transducer {
    /// Take one sample in the channel's engineering unit.
    fn sample(&mut self) -> Result<f64, SensorError>;

    /// Human-readable wiring description for logs.
    fn describe(&self) -> String;
}

/// Read strategy of a channel, fixed once at startup.
pub enum ChannelBinding {
    HardwareBound(Box<dyn Transducer>),
    SimulatedOnly,
}

// ---------------------------------------------------------------------------
// SensorChannel
// ---------------------------------------------------------------------------

pub struct SensorChannel {
    pub id: String,
    pub kind: ChannelKind,
    pub simulation: SimulationModel,
    pub valid_range: ValidRange,
    /// Exclusive lower bound applied to hardware values during the control
    /// loop only.  A MAX6675 with SO stuck low reads exactly 0 °C.
    pub runtime_floor: Option<f64>,
    binding: ChannelBinding,
}

impl SensorChannel {
    pub fn simulated(
        id: impl Into<String>,
        kind: ChannelKind,
        simulation: SimulationModel,
        valid_range: ValidRange,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            simulation,
            valid_range,
            runtime_floor: None,
            binding: ChannelBinding::SimulatedOnly,
        }
    }

    /// Reject hardware values `<= floor` in [`read`](Self::read).  The
    /// startup probe still uses `valid_range` alone.
    #[must_use]
    pub fn with_runtime_floor(mut self, floor: f64) -> Self {
        self.runtime_floor = Some(floor);
        self
    }

    /// Attach a transducer.  Only meaningful during startup wiring.
    #[must_use]
    pub fn with_transducer(mut self, transducer: Box<dyn Transducer>) -> Self {
        self.binding = ChannelBinding::HardwareBound(transducer);
        self
    }

    pub fn is_hardware_bound(&self) -> bool {
        matches!(self.binding, ChannelBinding::HardwareBound(_))
    }

    pub fn binding_description(&self) -> Option<String> {
        match &self.binding {
            ChannelBinding::HardwareBound(t) => Some(t.describe()),
            ChannelBinding::SimulatedOnly => None,
        }
    }

    /// One hardware sample checked against `valid_range` and rounded.
    /// `None` when the channel has no transducer.
    pub fn sample_hardware(&mut self) -> Option<Result<f64, SensorError>> {
        let range = self.valid_range;
        let kind = self.kind;
        match &mut self.binding {
            ChannelBinding::HardwareBound(t) => Some(
                t.sample()
                    .and_then(|v| range.check(v))
                    .map(|v| kind.round(v)),
            ),
            ChannelBinding::SimulatedOnly => None,
        }
    }

    /// Produce this tick's reading.  Never fails.
    pub fn read(&mut self, now: Timestamp, rng: &mut impl Rng) -> Reading {
        let floor = self.runtime_floor;
        let sample = self.sample_hardware().map(|r| {
            r.and_then(|v| match floor {
                Some(f) if v <= f => Err(SensorError::OutOfRange),
                _ => Ok(v),
            })
        });
        let (value, source) = match sample {
            Some(Ok(v)) => (v, ReadingSource::Hardware),
            Some(Err(e)) => {
                debug!("{}: hardware read failed ({}), simulating", self.id, e);
                (self.simulation.sample(self.kind, rng), ReadingSource::Simulated)
            }
            None => (self.simulation.sample(self.kind, rng), ReadingSource::Simulated),
        };
        Reading {
            channel_id: self.id.clone(),
            kind: self.kind,
            value,
            source,
            timestamp: now,
        }
    }
}

// ---------------------------------------------------------------------------
// ChannelBank
// ---------------------------------------------------------------------------

/// Owns every channel and the noise source shared by their simulations.
pub struct ChannelBank {
    channels: Vec<SensorChannel>,
    rng: StdRng,
}

impl ChannelBank {
    pub fn new(channels: Vec<SensorChannel>) -> Self {
        Self {
            channels,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic noise, for tests and replays.
    pub fn with_seed(channels: Vec<SensorChannel>, seed: u64) -> Self {
        Self {
            channels,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The rig's eight measurement points, all simulated.
    pub fn rig_channels(amplitude: f64) -> Vec<SensorChannel> {
        const TEMP_RANGE: ValidRange = ValidRange::new(-50.0, 1000.0);
        let temp = |id: &str, base: f64| {
            SensorChannel::simulated(
                id,
                ChannelKind::Temperature,
                SimulationModel::new(base, amplitude),
                TEMP_RANGE,
            )
            .with_runtime_floor(0.0)
        };
        vec![
            temp(FURNACE_CHANNEL, 350.0),
            SensorChannel::simulated(
                "Velocidade",
                ChannelKind::Velocity,
                SimulationModel::new(600.0, amplitude),
                ValidRange::new(0.0, 5000.0),
            ),
            temp("Temp Tanque", 120.0),
            temp("Temp Saída Gases", 300.0),
            SensorChannel::simulated(
                "Pressão Gases",
                ChannelKind::Pressure,
                SimulationModel::new(2.0, amplitude),
                ValidRange::new(0.0, 100.0),
            ),
            temp("Torre Nível 1", 110.0),
            temp("Torre Nível 2", 140.0),
            temp("Torre Nível 3", 180.0),
        ]
    }

    /// Replace the binding of channel `id`.  Returns `false` if no such
    /// channel exists.
    pub fn bind(&mut self, id: &str, transducer: Box<dyn Transducer>) -> bool {
        match self.channels.iter_mut().find(|c| c.id == id) {
            Some(ch) => {
                ch.binding = ChannelBinding::HardwareBound(transducer);
                true
            }
            None => false,
        }
    }

    /// Read every channel, in configuration order.
    pub fn read_all(&mut self, now: Timestamp) -> Vec<Reading> {
        let mut readings = Vec::with_capacity(self.channels.len());
        for channel in &mut self.channels {
            readings.push(channel.read(now, &mut self.rng));
        }
        readings
    }

    pub fn channels(&self) -> &[SensorChannel] {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut [SensorChannel] {
        &mut self.channels
    }

    pub fn hardware_bound_count(&self) -> usize {
        self.channels.iter().filter(|c| c.is_hardware_bound()).count()
    }
}
