//! Hardware adapter: bridges the channel bank and output stages to the
//! domain port traits.
//!
//! [`RigHardware`] owns the [`ChannelBank`] and one actuator backend and
//! exposes both through [`SensorPort`] and [`ActuatorPort`], so the
//! service can take a single `&mut` for a whole tick.
//!
//! Actuator backends:
//! - [`GpioActuators`]: relays and the drum stepper on real pins.
//! - [`SimulatedActuators`]: in-memory, for simulation mode.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{debug, error, info, warn};

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::drivers::relay::{Polarity, Relay};
use crate::drivers::stepper::{StepperDriver, burst_len};
use crate::error::ActuatorError;
use crate::sensors::{ChannelBank, Reading};
use crate::state::{ActuatorSet, Timestamp};

/// Concrete adapter that combines sensing and actuation behind port traits.
pub struct RigHardware<A> {
    bank: ChannelBank,
    actuators: A,
}

impl<A: ActuatorPort> RigHardware<A> {
    pub fn new(bank: ChannelBank, actuators: A) -> Self {
        Self { bank, actuators }
    }

    pub fn bank(&self) -> &ChannelBank {
        &self.bank
    }

    pub fn actuators(&self) -> &A {
        &self.actuators
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<A> SensorPort for RigHardware<A> {
    fn read_all(&mut self, now: Timestamp) -> Vec<Reading> {
        self.bank.read_all(now)
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<A: ActuatorPort> ActuatorPort for RigHardware<A> {
    fn apply(&mut self, set: &ActuatorSet, drum_step_rate: u32) {
        self.actuators.apply(set, drum_step_rate);
    }

    fn all_off(&mut self) {
        self.actuators.all_off();
    }

    fn release(&mut self) {
        self.actuators.release();
    }
}

// ───────────────────────────────────────────────────────────────
// GPIO backend
// ───────────────────────────────────────────────────────────────

/// Every output stage of the rig, on concrete pins.
pub struct RigOutputs<P, D> {
    pub blower: Relay<P>,
    pub resistor: Relay<P>,
    pub auger: Relay<P>,
    pub drum: StepperDriver<P, D>,
}

impl<P: OutputPin, D: DelayNs> RigOutputs<P, D> {
    /// Wrap raw pins.  Every relay starts de-energised and the stepper
    /// starts disabled.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        blower: P,
        resistor: P,
        auger: P,
        drum_dir: P,
        drum_pul: P,
        drum_ena: Option<P>,
        delay: D,
        polarity: Polarity,
    ) -> Result<Self, ActuatorError> {
        Ok(Self {
            blower: Relay::new(blower, polarity)?,
            resistor: Relay::new(resistor, polarity)?,
            auger: Relay::new(auger, polarity)?,
            drum: StepperDriver::new(drum_dir, drum_pul, drum_ena, delay)?,
        })
    }
}

pub struct GpioActuators<P, D> {
    outputs: Option<RigOutputs<P, D>>,
    tick_ms: u32,
    faulted: bool,
}

impl<P: OutputPin, D: DelayNs> GpioActuators<P, D> {
    pub fn new(outputs: RigOutputs<P, D>, tick_ms: u32) -> Self {
        Self {
            outputs: Some(outputs),
            tick_ms,
            faulted: false,
        }
    }

    pub fn outputs(&self) -> Option<&RigOutputs<P, D>> {
        self.outputs.as_ref()
    }

    fn drive(out: &mut RigOutputs<P, D>, set: &ActuatorSet, rate: u32, tick_ms: u32) -> Result<(), ActuatorError> {
        out.blower.set(set.blower)?;
        out.resistor.set(set.resistor)?;
        out.auger.set(set.auger)?;
        out.drum.set_direction(set.drum_direction)?;
        if set.drum_pulse {
            out.drum.pulse_burst(burst_len(rate, tick_ms), rate)?;
        } else if out.drum.is_enabled() {
            out.drum.disable()?;
        }
        Ok(())
    }
}

impl<P: OutputPin, D: DelayNs> ActuatorPort for GpioActuators<P, D> {
    fn apply(&mut self, set: &ActuatorSet, drum_step_rate: u32) {
        let Some(out) = self.outputs.as_mut() else {
            warn!("Actuator apply after release ignored");
            return;
        };
        match Self::drive(out, set, drum_step_rate, self.tick_ms) {
            Ok(()) => {
                if self.faulted {
                    info!("GPIO outputs recovered");
                }
                self.faulted = false;
            }
            Err(e) => {
                if !self.faulted {
                    error!("Actuator write failed: {}", e);
                }
                self.faulted = true;
            }
        }
    }

    fn all_off(&mut self) {
        let Some(out) = self.outputs.as_mut() else {
            return;
        };
        let results = [
            out.blower.set(false),
            out.resistor.set(false),
            out.auger.set(false),
            out.drum.disable(),
        ];
        for e in results.into_iter().filter_map(Result::err) {
            error!("All-off: {}", e);
        }
    }

    fn release(&mut self) {
        if self.outputs.take().is_some() {
            info!("GPIO outputs released");
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Simulated backend
// ───────────────────────────────────────────────────────────────

/// Keeps the commanded state in memory and logs changes.
#[derive(Debug, Default)]
pub struct SimulatedActuators {
    current: ActuatorSet,
    released: bool,
}

impl SimulatedActuators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> ActuatorSet {
        self.current
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl ActuatorPort for SimulatedActuators {
    fn apply(&mut self, set: &ActuatorSet, _drum_step_rate: u32) {
        if *set != self.current {
            debug!("Simulated outputs: {:?}", set);
            self.current = *set;
        }
    }

    fn all_off(&mut self) {
        self.current = ActuatorSet::all_off();
    }

    fn release(&mut self) {
        self.released = true;
    }
}
