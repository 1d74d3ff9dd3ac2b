//! Step/direction stepper driver for the rotary drum.
//!
//! ```text
//!  PUL ‾‾‾‾\____/‾‾‾‾\____/‾‾‾‾   idle high, one step per falling edge
//!          |half|half|
//!  DIR  low = forward, high = reverse (1 ms settle after a change)
//!  ENA  low = enabled (optional line)
//! ```
//!
//! Pulses are generated in bounded bursts so a single call never blocks
//! the control loop for more than half a tick.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::debug;

use crate::error::ActuatorError;

const DIR_SETTLE_MS: u32 = 1;
/// Fastest pulse rate the driver will generate.
pub const MAX_RATE_HZ: u32 = 50_000;

/// Number of pulses to emit per control tick at `rate_hz`, clamped to
/// `1..=MAX_RATE_HZ` like [`half_period_us`].
pub fn burst_len(rate_hz: u32, tick_ms: u32) -> u32 {
    let rate = rate_hz.clamp(1, MAX_RATE_HZ);
    let pulses = u64::from(rate) * u64::from(tick_ms) / 2000;
    pulses.clamp(1, u64::from(u32::MAX)) as u32
}

/// Half of one pulse period in microseconds.
pub fn half_period_us(rate_hz: u32) -> u32 {
    500_000 / rate_hz.clamp(1, MAX_RATE_HZ)
}

pub struct StepperDriver<P, D> {
    dir: P,
    pul: P,
    ena: Option<P>,
    delay: D,
    forward: Option<bool>,
    enabled: bool,
    steps: u64,
}

impl<P: OutputPin, D: DelayNs> StepperDriver<P, D> {
    /// Take the pins, park PUL high and leave the driver disabled.
    pub fn new(dir: P, mut pul: P, ena: Option<P>, delay: D) -> Result<Self, ActuatorError> {
        pul.set_high().map_err(|_| ActuatorError::GpioWriteFailed)?;
        let mut driver = Self {
            dir,
            pul,
            ena,
            delay,
            forward: None,
            enabled: true,
            steps: 0,
        };
        driver.disable()?;
        Ok(driver)
    }

    /// Select the rotation direction.  Only touches DIR when it changes.
    pub fn set_direction(&mut self, forward: bool) -> Result<(), ActuatorError> {
        if self.forward == Some(forward) {
            return Ok(());
        }
        if forward {
            self.dir.set_low()
        } else {
            self.dir.set_high()
        }
        .map_err(|_| ActuatorError::GpioWriteFailed)?;
        self.delay.delay_ms(DIR_SETTLE_MS);
        self.forward = Some(forward);
        Ok(())
    }

    /// Emit `count` pulses at `rate_hz`.  PUL is left high.
    pub fn pulse_burst(&mut self, count: u32, rate_hz: u32) -> Result<(), ActuatorError> {
        if !self.enabled {
            self.enable()?;
        }
        let half = half_period_us(rate_hz);
        for _ in 0..count {
            self.pul.set_low().map_err(|_| ActuatorError::GpioWriteFailed)?;
            self.delay.delay_us(half);
            self.pul.set_high().map_err(|_| ActuatorError::GpioWriteFailed)?;
            self.delay.delay_us(half);
            self.steps += 1;
        }
        Ok(())
    }

    pub fn enable(&mut self) -> Result<(), ActuatorError> {
        if let Some(ena) = self.ena.as_mut() {
            ena.set_low().map_err(|_| ActuatorError::GpioWriteFailed)?;
        }
        self.enabled = true;
        Ok(())
    }

    /// Park PUL high and de-assert ENA.
    pub fn disable(&mut self) -> Result<(), ActuatorError> {
        self.pul.set_high().map_err(|_| ActuatorError::GpioWriteFailed)?;
        if let Some(ena) = self.ena.as_mut() {
            ena.set_high().map_err(|_| ActuatorError::GpioWriteFailed)?;
        }
        if self.enabled {
            debug!("Drum stepper disabled after {} steps", self.steps);
        }
        self.enabled = false;
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Total pulses emitted since construction.
    pub fn steps(&self) -> u64 {
        self.steps
    }
}
