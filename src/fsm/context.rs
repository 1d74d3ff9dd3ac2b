//! Per-tick context threaded through every regime handler.
//!
//! `StepContext` is the blackboard the handlers read from and write to:
//! the inputs of one tick (settings, furnace temperature, time) and the
//! outputs being computed (actuators, timers), seeded with the previous
//! tick's values.

use crate::settings::ControlSettings;
use crate::state::{ActuatorSet, Timers, Timestamp};

pub struct StepContext<'a> {
    pub settings: &'a ControlSettings,
    /// Furnace-zone temperature this tick, if a finite reading exists.
    pub furnace_temp: Option<f64>,
    pub now: Timestamp,
    /// Starts as the previous tick's outputs.
    pub actuators: ActuatorSet,
    /// Starts as the previous tick's timers.
    pub timers: Timers,
}

impl<'a> StepContext<'a> {
    pub fn new(
        settings: &'a ControlSettings,
        furnace_temp: Option<f64>,
        actuators: ActuatorSet,
        timers: Timers,
        now: Timestamp,
    ) -> Self {
        Self {
            settings,
            furnace_temp,
            now,
            actuators,
            timers,
        }
    }

    /// Heating outputs off and both timers disarmed.
    pub fn stand_down(&mut self) {
        self.actuators.heating_off();
        self.timers = Timers::IDLE;
    }

    /// Milliseconds since `start` was armed, arming it now if it is not.
    pub fn elapsed_since_armed(now: Timestamp, start: &mut Option<Timestamp>) -> u64 {
        now.millis_since(*start.get_or_insert(now))
    }
}
