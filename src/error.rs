//! Unified error types for the furnace controller.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! process wiring in `main` only ever deals with one type.  All variants
//! are `Copy` so they can be stored in probe reports and passed around
//! without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A transducer could not be read or returned implausible data.
    Sensor(SensorError),
    /// An actuator output could not be driven.
    Actuator(ActuatorError),
    /// The persisted settings document or a setting value is invalid.
    Settings(SettingsError),
    /// The settings store or reading log failed.
    Storage(StorageError),
    /// Hardware mode was requested but no channel passed the startup probe.
    NoWorkingChannels {
        /// Number of hardware-bound channels that were probed.
        probed: usize,
    },
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Deployment configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Settings(e) => write!(f, "settings: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::NoWorkingChannels { probed } => {
                write!(f, "startup probe: none of {probed} hardware channels responded")
            }
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// GPIO or I2C transaction failed.
    BusFault,
    /// The converter did not finish within its polling budget.
    Timeout,
    /// MAX6675 reported an open thermocouple junction.
    OpenThermocouple,
    /// The transducer output indicates it is not wired.
    Disconnected,
    /// Reading is outside the channel's valid range (or not finite).
    OutOfRange,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusFault => write!(f, "bus transaction failed"),
            Self::Timeout => write!(f, "conversion timed out"),
            Self::OpenThermocouple => write!(f, "thermocouple open"),
            Self::Disconnected => write!(f, "transducer disconnected"),
            Self::OutOfRange => write!(f, "reading out of range"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// GPIO set failed.
    GpioWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Settings errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsError {
    /// The persisted document is not valid JSON or not a JSON object.
    Malformed { line: usize, column: usize },
    /// A known setting carried a value of the wrong shape.
    /// The `&'static str` names the setting family and the expected type.
    InvalidValue(&'static str),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { line, column } => {
                write!(f, "malformed settings document at {line}:{column}")
            }
            Self::InvalidValue(msg) => write!(f, "invalid value: {msg}"),
        }
    }
}

impl From<SettingsError> for Error {
    fn from(e: SettingsError) -> Self {
        Self::Settings(e)
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed {
            line: e.line(),
            column: e.column(),
        }
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// The underlying file operation failed.
    Io(std::io::ErrorKind),
    /// The record could not be serialised.
    Encode,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(kind) => write!(f, "I/O error: {kind}"),
            Self::Encode => write!(f, "encode failed"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.kind())
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
