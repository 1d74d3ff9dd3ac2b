//! On/off output stage (blower contactor, heater resistor, auger motor).
//!
//! The driver is a dumb actuator: it switches what it is told to and
//! remembers the last logical state.  Polarity is fixed at construction.

use embedded_hal::digital::OutputPin;

use crate::error::ActuatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Pin high = energised.
    ActiveHigh,
    /// Pin low = energised.
    ActiveLow,
}

impl Polarity {
    pub fn from_active_low(active_low: bool) -> Self {
        if active_low { Self::ActiveLow } else { Self::ActiveHigh }
    }

    /// Pin level of the de-energised state, for claiming a pin already off.
    pub fn idle_high(self) -> bool {
        self.level(false)
    }

    fn level(self, on: bool) -> bool {
        match self {
            Self::ActiveHigh => on,
            Self::ActiveLow => !on,
        }
    }
}

pub struct Relay<P> {
    pin: P,
    polarity: Polarity,
    on: bool,
}

impl<P: OutputPin> Relay<P> {
    /// Take the pin and drive it to the de-energised level.
    pub fn new(pin: P, polarity: Polarity) -> Result<Self, ActuatorError> {
        let mut relay = Self {
            pin,
            polarity,
            on: true,
        };
        relay.set(false)?;
        Ok(relay)
    }

    pub fn set(&mut self, on: bool) -> Result<(), ActuatorError> {
        let high = self.polarity.level(on);
        if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        }
        .map_err(|_| ActuatorError::GpioWriteFailed)?;
        self.on = on;
        Ok(())
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}
