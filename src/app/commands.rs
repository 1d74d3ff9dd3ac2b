//! Inbound commands to the application service.
//!
//! These arrive as JSON documents over the event channel:
//!
//! ```json
//! {"command": "SET_SETTING",    "payload": {"name": "temp_min", "value": 310}}
//! {"command": "MANUAL_CONTROL", "payload": {"target": "blower", "state": true}}
//! {"command": "REQUEST_FULL_UPDATE"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::settings::deserialize_flag;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InboundCommand {
    /// Merge one key into the control settings and persist them.
    SetSetting { name: String, value: Value },

    /// Set one actuator output.  Honoured only in manual mode.
    ManualControl {
        target: String,
        #[serde(deserialize_with = "deserialize_flag")]
        state: bool,
    },

    /// Broadcast the full state immediately.
    RequestFullUpdate,
}

impl InboundCommand {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// What the service did with a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    /// Snapshot broadcast out of band.
    Broadcast,
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// `MANUAL_CONTROL` while the system is in automatic mode.
    NotInManualMode,
    /// `MANUAL_CONTROL` naming no known actuator.
    UnknownTarget,
}

impl core::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotInManualMode => write!(f, "manual control while in automatic mode"),
            Self::UnknownTarget => write!(f, "unknown actuator target"),
        }
    }
}
