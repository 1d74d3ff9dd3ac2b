//! Channel bank and startup probe against scripted transducers.

use embedded_hal::delay::DelayNs;

use furnace::error::{Error, SensorError};
use furnace::sensors::probe::{ProbePolicy, validate_all};
use furnace::sensors::{ChannelBank, FURNACE_CHANNEL, ReadingSource, Transducer};
use furnace::state::Timestamp;

struct Fixed(Result<f64, SensorError>);

impl Transducer for Fixed {
    fn sample(&mut self) -> Result<f64, SensorError> {
        self.0
    }

    fn describe(&self) -> String {
        "fixed".into()
    }
}

/// Works for `good` samples, then fails forever.
struct Fading {
    good: usize,
}

impl Transducer for Fading {
    fn sample(&mut self) -> Result<f64, SensorError> {
        if self.good == 0 {
            return Err(SensorError::Timeout);
        }
        self.good -= 1;
        Ok(380.0)
    }

    fn describe(&self) -> String {
        "fading".into()
    }
}

struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

const POLICY: ProbePolicy = ProbePolicy {
    attempts: 3,
    backoff_ms: 1000,
};

#[test]
fn simulation_only_bank_reads_every_channel() {
    let mut bank = ChannelBank::with_seed(ChannelBank::rig_channels(50.0), 7);
    let readings = bank.read_all(Timestamp::from_millis(100));
    assert_eq!(readings.len(), 8);
    assert!(readings.iter().all(|r| r.source == ReadingSource::Simulated));
    assert_eq!(bank.hardware_bound_count(), 0);
}

#[test]
fn probe_with_no_working_channel_is_fatal() {
    let mut bank = ChannelBank::with_seed(ChannelBank::rig_channels(50.0), 7);
    assert!(bank.bind(FURNACE_CHANNEL, Box::new(Fixed(Err(SensorError::OpenThermocouple)))));
    assert!(bank.bind("Temp Tanque", Box::new(Fixed(Ok(5000.0)))));

    let result = validate_all(bank.channels_mut(), POLICY, &mut NoDelay);
    assert!(matches!(result, Err(Error::NoWorkingChannels { probed: 2 })));
}

#[test]
fn partial_probe_proceeds() {
    let mut bank = ChannelBank::with_seed(ChannelBank::rig_channels(50.0), 7);
    bank.bind(FURNACE_CHANNEL, Box::new(Fixed(Ok(352.5))));
    bank.bind("Temp Tanque", Box::new(Fixed(Err(SensorError::BusFault))));

    let report = validate_all(bank.channels_mut(), POLICY, &mut NoDelay).unwrap();
    assert_eq!(report.working(), 1);
    assert!(report.is_partial());
    assert_eq!(report.failed().count(), 1);
}

#[test]
fn validated_channel_that_later_fails_keeps_simulating() {
    let mut bank = ChannelBank::with_seed(ChannelBank::rig_channels(50.0), 7);
    bank.bind(FURNACE_CHANNEL, Box::new(Fading { good: 1 }));
    validate_all(bank.channels_mut(), POLICY, &mut NoDelay).unwrap();

    for tick in 0..20 {
        let readings = bank.read_all(Timestamp::from_millis(tick * 100));
        let furnace = readings.iter().find(|r| r.channel_id == FURNACE_CHANNEL).unwrap();
        assert_eq!(furnace.source, ReadingSource::Simulated);
        assert!((345.0..=355.0).contains(&furnace.value));
    }
    assert_eq!(bank.hardware_bound_count(), 1, "binding is never dropped");
}
