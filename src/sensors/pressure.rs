//! 0.5–4.5 V gas pressure transducer read through an ADS1115 ADC.
//!
//! The transducer maps 0.5 V → 0 PSI and 4.5 V → 30 PSI.  The installed
//! unit reads low against a reference gauge, hence the calibration
//! factor.  A wired transducer never idles below 0.4 V, so anything lower
//! is reported as disconnected rather than as zero pressure.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::error::SensorError;

use super::Transducer;

pub const DEFAULT_ADDRESS: u8 = 0x48;
pub const DEFAULT_CALIBRATION: f64 = 1.553;

const REG_CONVERSION: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;

/// OS=1 (start) | PGA=001 (±4.096 V) | MODE=1 (single-shot).
const CONFIG_BASE: u16 = 0x8000 | (0b001 << 9) | 0x0100;
/// DR=100 (128 SPS) | comparator disabled.
const CONFIG_RATE_NO_COMP: u16 = 0x0083;
const OS_READY: u8 = 0x80;
const FULL_SCALE_VOLTS: f64 = 4.096;
/// A 128 SPS conversion takes ~8 ms; poll a little past that.
const READY_POLLS: u32 = 6;
const READY_POLL_MS: u32 = 2;

const MIN_WIRED_VOLTS: f64 = 0.4;
const MAX_VALID_VOLTS: f64 = 4.6;
const ZERO_VOLTS: f64 = 0.5;
const PSI_PER_VOLT: f64 = 30.0 / 4.0;

/// Convert transducer output voltage into PSI.
pub fn volts_to_psi(volts: f64, calibration: f64) -> Result<f64, SensorError> {
    if !volts.is_finite() || volts > MAX_VALID_VOLTS {
        return Err(SensorError::OutOfRange);
    }
    if volts < MIN_WIRED_VOLTS {
        return Err(SensorError::Disconnected);
    }
    Ok(((volts - ZERO_VOLTS) * PSI_PER_VOLT * calibration).max(0.0))
}

pub struct Ads1115Pressure<I, D> {
    i2c: I,
    delay: D,
    address: u8,
    /// Single-ended input AIN0..AIN3.
    input: u8,
    calibration: f64,
}

impl<I: I2c, D: DelayNs> Ads1115Pressure<I, D> {
    pub fn new(i2c: I, delay: D, address: u8, input: u8, calibration: f64) -> Self {
        Self {
            i2c,
            delay,
            address,
            input: input.min(3),
            calibration,
        }
    }

    fn config_word(&self) -> u16 {
        let mux = 0b100 | u16::from(self.input);
        CONFIG_BASE | (mux << 12) | CONFIG_RATE_NO_COMP
    }

    /// Trigger one single-shot conversion and return the input voltage.
    pub fn read_volts(&mut self) -> Result<f64, SensorError> {
        let [hi, lo] = self.config_word().to_be_bytes();
        self.i2c
            .write(self.address, &[REG_CONFIG, hi, lo])
            .map_err(|_| SensorError::BusFault)?;

        let mut ready = false;
        for _ in 0..READY_POLLS {
            self.delay.delay_ms(READY_POLL_MS);
            let mut status = [0u8; 2];
            self.i2c
                .write_read(self.address, &[REG_CONFIG], &mut status)
                .map_err(|_| SensorError::BusFault)?;
            if status[0] & OS_READY != 0 {
                ready = true;
                break;
            }
        }
        if !ready {
            return Err(SensorError::Timeout);
        }

        let mut raw = [0u8; 2];
        self.i2c
            .write_read(self.address, &[REG_CONVERSION], &mut raw)
            .map_err(|_| SensorError::BusFault)?;
        Ok(f64::from(i16::from_be_bytes(raw)) * FULL_SCALE_VOLTS / 32768.0)
    }
}

impl<I: I2c, D: DelayNs> Transducer for Ads1115Pressure<I, D> {
    fn sample(&mut self) -> Result<f64, SensorError> {
        volts_to_psi(self.read_volts()?, self.calibration)
    }

    fn describe(&self) -> String {
        format!("ADS1115@{:#04x} AIN{}", self.address, self.input)
    }
}
