//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter           | Implements          | Connects to                  |
//! |-------------------|---------------------|------------------------------|
//! | `hardware`        | SensorPort          | ChannelBank (MAX6675, ADS1115)|
//! |                   | ActuatorPort        | relays + drum stepper / sim  |
//! | `json_store`      | SettingsStore       | pretty JSON settings file    |
//! | `log_sink`        | EventSink           | `log` facade                 |
//! | `reading_log`     | ReadingLog          | JSON-lines history file      |
//! | `stdio_transport` | EventSink           | stdout (state updates)       |
//! |                   | CommandQueue feeder | stdin (commands)             |
//! | `time`            | Clock, DelayNs      | `std::time::Instant`, sleep  |
//! | `rpi`             |:                   | rppal GPIO / I2C (`rpi`)     |

pub mod hardware;
pub mod json_store;
pub mod log_sink;
pub mod reading_log;
#[cfg(feature = "rpi")]
pub mod rpi;
pub mod stdio_transport;
pub mod time;
