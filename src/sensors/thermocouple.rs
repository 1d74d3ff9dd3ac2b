//! MAX6675 K-type thermocouple converter, bit-banged over three GPIOs.
//!
//! The converter shifts out a 16-bit frame MSB-first while CS is low:
//!
//! ```text
//!  D15      D14..D3          D2     D1   D0
//!  dummy    temperature      open   id   tri-state
//!           (12 bit, 0.25°C)
//! ```
//!
//! Each read toggles SCK exactly 16 times, so it completes in a few
//! milliseconds or fails on the first GPIO error.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::SensorError;

use super::Transducer;

const OPEN_THERMOCOUPLE_BIT: u16 = 0x0004;
const CLOCK_HALF_PERIOD_US: u32 = 100;
const CS_SETTLE_MS: u32 = 1;

/// Decode a raw frame into degrees Celsius.
pub fn decode(raw: u16) -> Result<f64, SensorError> {
    if raw & OPEN_THERMOCOUPLE_BIT != 0 {
        return Err(SensorError::OpenThermocouple);
    }
    Ok(f64::from((raw >> 3) & 0x1FFF) * 0.25)
}

pub struct Max6675<Sck, Cs, So, D> {
    sck: Sck,
    cs: Cs,
    so: So,
    delay: D,
    label: String,
}

impl<Sck, Cs, So, D> Max6675<Sck, Cs, So, D>
where
    Sck: OutputPin,
    Cs: OutputPin,
    So: InputPin,
    D: DelayNs,
{
    /// Take ownership of the pins and park the bus idle (CS high, SCK low).
    pub fn new(mut sck: Sck, mut cs: Cs, so: So, delay: D, label: impl Into<String>) -> Result<Self, SensorError> {
        cs.set_high().map_err(|_| SensorError::BusFault)?;
        sck.set_low().map_err(|_| SensorError::BusFault)?;
        Ok(Self {
            sck,
            cs,
            so,
            delay,
            label: label.into(),
        })
    }

    /// Clock one raw frame out of the converter.  CS is released even if
    /// a pin operation fails halfway.
    pub fn read_raw(&mut self) -> Result<u16, SensorError> {
        self.cs.set_low().map_err(|_| SensorError::BusFault)?;
        self.delay.delay_ms(CS_SETTLE_MS);
        let frame = self.shift_frame();
        let released = self.cs.set_high().map_err(|_| SensorError::BusFault);
        let raw = frame?;
        released?;
        Ok(raw)
    }

    pub fn read_celsius(&mut self) -> Result<f64, SensorError> {
        decode(self.read_raw()?)
    }

    fn shift_frame(&mut self) -> Result<u16, SensorError> {
        let mut data = 0u16;
        for _ in 0..16 {
            self.sck.set_high().map_err(|_| SensorError::BusFault)?;
            self.delay.delay_us(CLOCK_HALF_PERIOD_US);
            let bit = self.so.is_high().map_err(|_| SensorError::BusFault)?;
            data = (data << 1) | u16::from(bit);
            self.sck.set_low().map_err(|_| SensorError::BusFault)?;
            self.delay.delay_us(CLOCK_HALF_PERIOD_US);
        }
        Ok(data)
    }
}

impl<Sck, Cs, So, D> Transducer for Max6675<Sck, Cs, So, D>
where
    Sck: OutputPin,
    Cs: OutputPin,
    So: InputPin,
    D: DelayNs,
{
    fn sample(&mut self) -> Result<f64, SensorError> {
        self.read_celsius()
    }

    fn describe(&self) -> String {
        format!("MAX6675 {}", self.label)
    }
}
