//! One-shot startup validation of hardware-bound channels.
//!
//! Runs once, before the control loop, and only in hardware mode.  Each
//! bound channel gets a bounded number of attempts with a fixed backoff;
//! the first in-range sample marks it working.  Channels are never
//! rebound or marked: a channel that fails here still owns its
//! transducer and simply keeps falling back to simulation at runtime.

use embedded_hal::delay::DelayNs;
use heapless::Vec as BoundedVec;
use log::{info, warn};

use crate::error::{Error, Result, SensorError};

use super::SensorChannel;

/// Upper bound on attempts per channel.
pub const MAX_PROBE_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    pub attempts: u8,
    pub backoff_ms: u32,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProbeStatus {
    /// Validated with this first good value.
    Working(f64),
    /// Every attempt failed.
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelProbe {
    pub channel_id: String,
    /// Outcome of every attempt, in order.
    pub attempts: BoundedVec<core::result::Result<f64, SensorError>, MAX_PROBE_ATTEMPTS>,
    pub status: ProbeStatus,
}

impl ChannelProbe {
    pub fn is_working(&self) -> bool {
        matches!(self.status, ProbeStatus::Working(_))
    }
}

/// Aggregate outcome of [`validate_all`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationReport {
    pub channels: Vec<ChannelProbe>,
}

impl ValidationReport {
    pub fn working(&self) -> usize {
        self.channels.iter().filter(|c| c.is_working()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &ChannelProbe> {
        self.channels.iter().filter(|c| !c.is_working())
    }

    pub fn is_partial(&self) -> bool {
        let working = self.working();
        working > 0 && working < self.channels.len()
    }
}

/// Probe every hardware-bound channel.
///
/// Fails with [`Error::NoWorkingChannels`] when not a single channel
/// validates.  A partial result is returned as `Ok` after a warning.
pub fn validate_all(
    channels: &mut [SensorChannel],
    policy: ProbePolicy,
    delay: &mut impl DelayNs,
) -> Result<ValidationReport> {
    let attempts = usize::from(policy.attempts).clamp(1, MAX_PROBE_ATTEMPTS);
    let mut report = ValidationReport::default();

    for channel in channels.iter_mut().filter(|c| c.is_hardware_bound()) {
        let wiring = channel.binding_description().unwrap_or_default();
        info!("Probing '{}' ({})", channel.id, wiring);

        let mut probe = ChannelProbe {
            channel_id: channel.id.clone(),
            attempts: BoundedVec::new(),
            status: ProbeStatus::Failed,
        };

        for attempt in 1..=attempts {
            let outcome = channel
                .sample_hardware()
                .unwrap_or(Err(SensorError::Disconnected));
            // Capacity is MAX_PROBE_ATTEMPTS and `attempts` is clamped to it.
            let _ = probe.attempts.push(outcome);
            match outcome {
                Ok(value) => {
                    info!("  attempt {}/{}: ok, {:.1}", attempt, attempts, value);
                    probe.status = ProbeStatus::Working(value);
                    break;
                }
                Err(e) => {
                    warn!("  attempt {}/{}: {}", attempt, attempts, e);
                    if attempt < attempts {
                        delay.delay_ms(policy.backoff_ms);
                    }
                }
            }
        }
        report.channels.push(probe);
    }

    let probed = report.channels.len();
    let working = report.working();
    if working == 0 {
        for failed in report.failed() {
            warn!("  '{}': no response", failed.channel_id);
        }
        return Err(Error::NoWorkingChannels { probed });
    }
    if working < probed {
        warn!(
            "Startup probe: {}/{} hardware channels working, the rest will run simulated",
            working, probed
        );
        for failed in report.failed() {
            warn!("  '{}': no response", failed.channel_id);
        }
    } else {
        info!("Startup probe: all {} hardware channels working", probed);
    }
    Ok(report)
}
