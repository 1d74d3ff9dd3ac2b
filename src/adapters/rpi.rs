//! Raspberry Pi wiring (feature `rpi`).
//!
//! Opens the GPIO and I2C peripherals through `rppal` and turns a
//! [`RigConfig`] into bound transducers and output stages.  Every other
//! module stays generic over `embedded-hal`; this is the only place that
//! names concrete pins.

use log::{info, warn};
use rppal::gpio::{Gpio, OutputPin};
use rppal::i2c::I2c;

use crate::config::RigConfig;
use crate::drivers::relay::Polarity;
use crate::error::{Error, Result};
use crate::sensors::ChannelBank;
use crate::sensors::pressure::Ads1115Pressure;
use crate::sensors::thermocouple::Max6675;

use super::hardware::{GpioActuators, RigOutputs};
use super::time::StdDelay;

pub struct RpiPeripherals {
    gpio: Gpio,
}

impl RpiPeripherals {
    pub fn open() -> Result<Self> {
        let gpio = Gpio::new().map_err(|_| Error::Init("GPIO controller unavailable"))?;
        Ok(Self { gpio })
    }

    /// Claim `pin` as an output already driven to `high`.
    fn output(&self, pin: u8, high: bool) -> Result<OutputPin> {
        self.gpio
            .get(pin)
            .map(|p| if high { p.into_output_high() } else { p.into_output_low() })
            .map_err(|_| Error::Init("GPIO output pin unavailable"))
    }

    /// Bind every configured MAX6675 and the optional ADS1115 to their
    /// channels.  Returns the number of channels bound.
    pub fn bind_transducers(&self, config: &RigConfig, bank: &mut ChannelBank) -> Result<usize> {
        let mut bound = 0;
        for tc in &config.thermocouples {
            let sck = self.output(tc.sck, false)?;
            let cs = self.output(tc.cs, true)?;
            let so = self
                .gpio
                .get(tc.so)
                .map(|p| p.into_input())
                .map_err(|_| Error::Init("GPIO input pin unavailable"))?;
            let driver = Max6675::new(sck, cs, so, StdDelay, tc.channel.clone())?;
            if bank.bind(&tc.channel, Box::new(driver)) {
                info!("Bound MAX6675 to '{}' (SCK={} CS={} SO={})", tc.channel, tc.sck, tc.cs, tc.so);
                bound += 1;
            } else {
                warn!("No channel named '{}'; thermocouple left unbound", tc.channel);
            }
        }

        if let Some(p) = &config.pressure {
            let i2c = I2c::new().map_err(|_| Error::Init("I2C bus unavailable"))?;
            let adc = Ads1115Pressure::new(i2c, StdDelay, p.i2c_address, p.input, p.calibration);
            if bank.bind(&p.channel, Box::new(adc)) {
                info!("Bound ADS1115@0x{:02X} AIN{} to '{}'", p.i2c_address, p.input, p.channel);
                bound += 1;
            } else {
                warn!("No channel named '{}'; pressure input left unbound", p.channel);
            }
        }
        Ok(bound)
    }

    /// Claim the output pins, each at its de-energised level: relays per
    /// polarity, PUL high (idle), ENA high (disabled).
    pub fn actuators(&self, config: &RigConfig) -> Result<GpioActuators<OutputPin, StdDelay>> {
        let o = &config.outputs;
        let polarity = Polarity::from_active_low(config.outputs_active_low);
        let relay_idle = polarity.idle_high();
        let ena = o.drum_enable.map(|pin| self.output(pin, true)).transpose()?;
        let outputs = RigOutputs::new(
            self.output(o.blower, relay_idle)?,
            self.output(o.resistor, relay_idle)?,
            self.output(o.auger, relay_idle)?,
            self.output(o.drum_dir, false)?,
            self.output(o.drum_pul, true)?,
            ena,
            StdDelay,
            polarity,
        )?;
        info!(
            "GPIO outputs claimed: blower={} resistor={} auger={} drum_dir={} drum_pul={} ({})",
            o.blower,
            o.resistor,
            o.auger,
            o.drum_dir,
            o.drum_pul,
            if config.outputs_active_low { "active low" } else { "active high" }
        );
        Ok(GpioActuators::new(outputs, config.tick_interval_ms))
    }
}
