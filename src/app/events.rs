//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log them, write snapshots to the
//! event channel, or both.

use crate::fsm::Regime;
use crate::settings::SystemMode;
use crate::state::SystemState;

use super::commands::IgnoreReason;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Full state after a tick or on request.  Observers must tolerate
    /// identical consecutive snapshots.
    Snapshot(Box<SystemState>),

    /// The automatic policy changed regime.
    RegimeChanged { from: Option<Regime>, to: Regime },

    /// A `SET_SETTING` was applied (and persisted, unless
    /// `persisted` is false).
    SettingChanged { name: String, persisted: bool },

    /// A `MANUAL_CONTROL` was dropped.
    CommandIgnored { target: String, reason: IgnoreReason },

    /// The service is about to run its first tick.
    Started {
        mode: SystemMode,
        hardware_channels: usize,
    },

    /// Outputs have been driven off and released.
    Stopped,
}
