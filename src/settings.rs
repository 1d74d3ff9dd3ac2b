//! Runtime control settings.
//!
//! [`ControlSettings`] is the only configuration an operator can change
//! while the rig is running.  It is mutated one key at a time through
//! [`ControlSettings::apply`] and persisted as a flat JSON document whose
//! keys are setting names.
//!
//! Older documents written by the rig's panel software use different key
//! names (`heating_on`, `resistencia_timer`, ...).  Those are accepted on
//! load and on `SET_SETTING`, and are written back under the canonical
//! names.  Keys this module does not know are kept verbatim in
//! [`ControlSettings::extra`] and survive a save.

use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::drivers::stepper::MAX_RATE_HZ;
use crate::error::SettingsError;
use crate::sensors::FURNACE_CHANNEL;

/// Control policy selector.
///
/// Persisted as `0` (automatic) / `1` (manual) for compatibility with the
/// panel software; the words `"automatic"` and `"manual"` are accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "u8")]
pub enum SystemMode {
    #[default]
    Automatic,
    Manual,
}

impl From<SystemMode> for u8 {
    fn from(mode: SystemMode) -> Self {
        match mode {
            SystemMode::Automatic => 0,
            SystemMode::Manual => 1,
        }
    }
}

impl TryFrom<Value> for SystemMode {
    type Error = SettingsError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let invalid = SettingsError::InvalidValue("system_mode expects 0, 1, \"automatic\" or \"manual\"");
        match &value {
            Value::Number(n) => match n.as_f64() {
                Some(x) if x == 0.0 => Ok(Self::Automatic),
                Some(x) if x == 1.0 => Ok(Self::Manual),
                _ => Err(invalid),
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "0" | "auto" | "automatic" => Ok(Self::Automatic),
                "1" | "manual" => Ok(Self::Manual),
                _ => Err(invalid),
            },
            _ => Err(invalid),
        }
    }
}

/// Informational thresholds for a zone other than the furnace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneLimits {
    pub temp_min: f64,
    pub temp_max: f64,
}

impl Default for ZoneLimits {
    fn default() -> Self {
        Self {
            temp_min: DEFAULT_TEMP_MIN,
            temp_max: DEFAULT_TEMP_MAX,
        }
    }
}

const DEFAULT_TEMP_MIN: f64 = 300.0;
const DEFAULT_TEMP_MAX: f64 = 400.0;

/// Operator-adjustable control parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlSettings {
    pub system_mode: SystemMode,
    pub heating_enabled: bool,
    /// Furnace zone lower threshold (°C).
    pub temp_min: f64,
    /// Furnace zone upper threshold (°C).
    pub temp_max: f64,
    /// Thresholds of the other zones, keyed by channel id.  Never used
    /// for control decisions.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub zones: BTreeMap<String, ZoneLimits>,
    /// Seconds the resistor stays on once a below-min episode starts.
    pub resistor_on_duration: u32,
    /// Auger duty cycle, seconds on.
    pub auger_on_duration: u32,
    /// Auger duty cycle, seconds off.
    pub auger_off_duration: u32,
    /// Drum stepper pulses per second.
    pub drum_step_rate: u32,
    /// Keys with no meaning to the controller, kept for the panel.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            system_mode: SystemMode::Automatic,
            heating_enabled: false,
            temp_min: DEFAULT_TEMP_MIN,
            temp_max: DEFAULT_TEMP_MAX,
            zones: BTreeMap::new(),
            resistor_on_duration: 10,
            auger_on_duration: 5,
            auger_off_duration: 10,
            drum_step_rate: 500,
            extra: Map::new(),
        }
    }
}

impl ControlSettings {
    /// Build settings from a persisted document, starting from defaults
    /// and applying every key in turn.
    pub fn from_document(doc: &Map<String, Value>) -> Result<Self, SettingsError> {
        let mut settings = Self::default();
        for (name, value) in doc {
            settings.apply(name, value)?;
        }
        Ok(settings)
    }

    /// Merge one setting into the record.
    ///
    /// Durations and the drum rate are coerced to whole numbers `>= 1`;
    /// the drum rate is also capped at [`MAX_RATE_HZ`].
    /// On error the record is left untouched.
    pub fn apply(&mut self, name: &str, value: &Value) -> Result<(), SettingsError> {
        match name {
            "system_mode" => self.system_mode = SystemMode::try_from(value.clone())?,
            "heating_enabled" | "heating_on" | "heating_status" => {
                self.heating_enabled = as_flag(value)
                    .ok_or(SettingsError::InvalidValue("heating_enabled expects a bool or 0/1"))?;
            }
            "temp_min" => self.temp_min = threshold(value)?,
            "temp_max" => self.temp_max = threshold(value)?,
            "resistor_on_duration" | "resistencia_timer" => {
                self.resistor_on_duration = whole_at_least_one(value)?;
            }
            "auger_on_duration" | "rosca_on_timer" => {
                self.auger_on_duration = whole_at_least_one(value)?;
            }
            "auger_off_duration" | "rosca_off_timer" => {
                self.auger_off_duration = whole_at_least_one(value)?;
            }
            "drum_step_rate" => self.drum_step_rate = whole_at_least_one(value)?.min(MAX_RATE_HZ),
            "zones" => {
                self.zones = serde_json::from_value(value.clone()).map_err(|_| {
                    SettingsError::InvalidValue("zones expects {zone: {temp_min, temp_max}}")
                })?;
            }
            _ => match split_zone_key(name) {
                Some((FURNACE_CHANNEL, limit)) => {
                    let t = threshold(value)?;
                    match limit {
                        Limit::Min => self.temp_min = t,
                        Limit::Max => self.temp_max = t,
                    }
                }
                Some((zone, limit)) => {
                    let t = threshold(value)?;
                    let entry = self.zones.entry(zone.to_owned()).or_default();
                    match limit {
                        Limit::Min => entry.temp_min = t,
                        Limit::Max => entry.temp_max = t,
                    }
                }
                None => {
                    self.extra.insert(name.to_owned(), value.clone());
                }
            },
        }

        if self.temp_min > self.temp_max {
            warn!(
                "settings: temp_min {:.1} above temp_max {:.1}, below-min takes precedence",
                self.temp_min, self.temp_max
            );
        }
        Ok(())
    }

    /// Length of one auger duty cycle in milliseconds.
    pub fn auger_cycle_millis(&self) -> u64 {
        (u64::from(self.auger_on_duration) + u64::from(self.auger_off_duration)) * 1000
    }
}

impl<'de> Deserialize<'de> for ControlSettings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let doc = Map::<String, Value>::deserialize(deserializer)?;
        Self::from_document(&doc).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Value coercion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Limit {
    Min,
    Max,
}

/// `"<zone id>.temp_min"` / `"<zone id>.temp_max"`.
fn split_zone_key(name: &str) -> Option<(&str, Limit)> {
    let (zone, field) = name.rsplit_once('.')?;
    let limit = match field {
        "temp_min" => Limit::Min,
        "temp_max" => Limit::Max,
        _ => return None,
    };
    (!zone.is_empty()).then_some((zone, limit))
}

/// Interpret a JSON value as an on/off flag: bools, numbers (non-zero is
/// on) and the usual words.
pub(crate) fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|x| x != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "1" => Some(true),
            "false" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|x| x.is_finite())
}

fn threshold(value: &Value) -> Result<f64, SettingsError> {
    as_number(value).ok_or(SettingsError::InvalidValue("temperature limits expect a number"))
}

fn whole_at_least_one(value: &Value) -> Result<u32, SettingsError> {
    let n = as_number(value).ok_or(SettingsError::InvalidValue(
        "durations and rates expect a number",
    ))?;
    Ok(n.round().clamp(1.0, f64::from(u32::MAX)) as u32)
}

/// `deserialize_with` helper accepting anything [`as_flag`] understands.
pub(crate) fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    as_flag(&value).ok_or_else(|| serde::de::Error::custom("expected a bool or a number"))
}
