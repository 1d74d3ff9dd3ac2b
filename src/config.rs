//! Deployment configuration
//!
//! Parameters that describe the rig itself (wiring, timing, file
//! locations).  Fixed for the life of the process; operator-adjustable
//! values live in [`ControlSettings`](crate::settings::ControlSettings).
//!
//! Loaded from an optional JSON file named by `FURNACE_RIG_CONFIG`, then
//! individual environment overrides are applied.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, SettingsError, StorageError};
use crate::sensors::probe::{MAX_PROBE_ATTEMPTS, ProbePolicy};
use crate::sensors::{DEFAULT_AMPLITUDE, FURNACE_CHANNEL};

pub const ENV_RIG_CONFIG: &str = "FURNACE_RIG_CONFIG";
pub const ENV_SETTINGS_PATH: &str = "FURNACE_SETTINGS_PATH";
pub const ENV_READINGS_PATH: &str = "FURNACE_READINGS_PATH";
pub const ENV_HARDWARE: &str = "FURNACE_HARDWARE";

/// BCM pins of one bit-banged MAX6675.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThermocouplePins {
    pub channel: String,
    pub sck: u8,
    pub cs: u8,
    pub so: u8,
}

/// ADS1115-attached pressure transducer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureInput {
    pub channel: String,
    pub i2c_address: u8,
    /// Single-ended ADC input, 0..=3.
    pub input: u8,
    pub calibration: f64,
}

/// BCM pins of the actuator outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPins {
    pub blower: u8,
    pub resistor: u8,
    pub auger: u8,
    pub drum_dir: u8,
    pub drum_pul: u8,
    /// Stepper driver ENA line, if wired.
    pub drum_enable: Option<u8>,
}

impl Default for OutputPins {
    fn default() -> Self {
        Self {
            blower: 14,
            resistor: 26,
            auger: 12,
            drum_dir: 13,
            drum_pul: 19,
            drum_enable: None,
        }
    }
}

/// Core deployment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    // --- Timing ---
    /// Control loop period (milliseconds)
    pub tick_interval_ms: u32,
    /// Minimum spacing of reading-log rows per channel (seconds)
    pub reading_log_interval_secs: u32,

    // --- Startup probe ---
    pub probe_attempts: u8,
    pub probe_backoff_ms: u32,

    // --- Files ---
    pub settings_path: PathBuf,
    pub readings_path: PathBuf,

    // --- Hardware ---
    /// Bind transducers and GPIO outputs; otherwise everything is simulated.
    pub hardware: bool,
    pub thermocouples: Vec<ThermocouplePins>,
    pub pressure: Option<PressureInput>,
    pub outputs: OutputPins,
    /// Outputs are switched by pulling the pin low.
    pub outputs_active_low: bool,
    /// Noise amplitude of the simulation models.
    pub simulation_amplitude: f64,
}

impl Default for RigConfig {
    fn default() -> Self {
        let tc = |channel: &str, sck, cs, so| ThermocouplePins {
            channel: channel.to_owned(),
            sck,
            cs,
            so,
        };
        Self {
            tick_interval_ms: 100,
            reading_log_interval_secs: 5,

            probe_attempts: 3,
            probe_backoff_ms: 1000,

            settings_path: PathBuf::from("settings.json"),
            readings_path: PathBuf::from("sensor_readings.jsonl"),

            hardware: false,
            thermocouples: vec![
                tc("Torre Nível 1", 25, 24, 18),
                tc("Torre Nível 2", 7, 8, 23),
                tc("Torre Nível 3", 21, 20, 16),
                tc("Temp Tanque", 4, 3, 2),
                tc("Temp Saída Gases", 22, 27, 17),
                tc(FURNACE_CHANNEL, 11, 9, 10),
            ],
            pressure: None,
            outputs: OutputPins::default(),
            outputs_active_low: false,
            simulation_amplitude: DEFAULT_AMPLITUDE,
        }
    }
}

impl RigConfig {
    /// Parse a JSON config document.  Missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(SettingsError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the file named by `FURNACE_RIG_CONFIG` (if set),
    /// then single-value environment overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var_os(ENV_RIG_CONFIG) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(StorageError::from)?;
        Self::from_json(&text)
    }

    /// Apply `FURNACE_*` overrides from any key lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(ENV_SETTINGS_PATH) {
            self.settings_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_READINGS_PATH) {
            self.readings_path = PathBuf::from(path);
        }
        if let Some(flag) = lookup(ENV_HARDWARE) {
            self.hardware = matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(Error::Config("tick_interval_ms must be > 0"));
        }
        if self.probe_attempts == 0 || usize::from(self.probe_attempts) > MAX_PROBE_ATTEMPTS {
            return Err(Error::Config("probe_attempts must be within 1..=8"));
        }
        if u64::from(self.reading_log_interval_secs) * 1000 < u64::from(self.tick_interval_ms) {
            return Err(Error::Config("reading_log_interval_secs shorter than one tick"));
        }
        if !self.simulation_amplitude.is_finite() || self.simulation_amplitude < 0.0 {
            return Err(Error::Config("simulation_amplitude must be a non-negative number"));
        }
        if let Some(p) = &self.pressure {
            if p.input > 3 {
                return Err(Error::Config("pressure input must be within 0..=3"));
            }
        }
        Ok(())
    }

    pub fn probe_policy(&self) -> ProbePolicy {
        ProbePolicy {
            attempts: self.probe_attempts,
            backoff_ms: self.probe_backoff_ms,
        }
    }

    pub fn reading_log_interval_ms(&self) -> u64 {
        u64::from(self.reading_log_interval_secs) * 1000
    }
}
