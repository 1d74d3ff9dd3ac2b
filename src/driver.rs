//! Control loop driver.
//!
//! Owns the [`AppService`] and every adapter, and runs ticks on a fixed
//! period until the stop flag is raised:
//!
//! ```text
//!  ┌──────────── tick ────────────┐
//!  drain queue → commands → acquire → decide → broadcast → actuate → log
//!  └──────────────────────────────┘ sleep to next boundary (missed ones skipped)
//! ```
//!
//! On exit every output is driven off before the hardware is released.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, info, warn};

use crate::app::commands::InboundCommand;
use crate::app::ports::{ActuatorPort, Clock, EventSink, ReadingLog, SensorPort, SettingsStore};
use crate::app::queue::CommandQueue;
use crate::app::service::AppService;
use crate::state::Timestamp;

/// Longest single sleep; bounds how late a stop request is noticed.
const MAX_SLEEP_SLICE_MS: u64 = 20;

/// Next tick boundary after `now`, on the grid `previous + k·period`.
/// Boundaries that have already passed are skipped, never replayed.
pub fn next_deadline(previous: Timestamp, now: Timestamp, period_ms: u64) -> Timestamp {
    let period = period_ms.max(1);
    let elapsed = now.millis_since(previous);
    let periods = elapsed / period + 1;
    previous.plus_millis(periods * period)
}

pub struct ControlLoop<H, S, St, L, C> {
    service: AppService,
    hw: H,
    sink: S,
    store: St,
    log: L,
    clock: C,
    queue: Arc<CommandQueue>,
    tick_ms: u64,
}

impl<H, S, St, L, C> ControlLoop<H, S, St, L, C>
where
    H: SensorPort + ActuatorPort,
    S: EventSink,
    St: SettingsStore,
    L: ReadingLog,
    C: Clock,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        service: AppService,
        hw: H,
        sink: S,
        store: St,
        log: L,
        clock: C,
        queue: Arc<CommandQueue>,
        tick_ms: u32,
    ) -> Self {
        Self {
            service,
            hw,
            sink,
            store,
            log,
            clock,
            queue,
            tick_ms: u64::from(tick_ms.max(1)),
        }
    }

    /// Apply every queued command, then run one tick at `now`.
    pub fn run_once(&mut self, now: Timestamp) {
        for cmd in self.queue.drain() {
            self.dispatch(cmd);
        }
        self.service.tick(now, &mut self.hw, &mut self.sink, &mut self.log);
    }

    fn dispatch(&mut self, cmd: InboundCommand) {
        let label = match &cmd {
            InboundCommand::SetSetting { name, .. } => name.clone(),
            InboundCommand::ManualControl { target, .. } => target.clone(),
            InboundCommand::RequestFullUpdate => String::from("full update"),
        };
        match self.service.handle_command(cmd, &self.store, &mut self.sink) {
            Ok(outcome) => debug!("Command '{}': {:?}", label, outcome),
            Err(e) => warn!("Command '{}' failed: {}", label, e),
        }
    }

    /// Tick until `stop` is raised, then shut the outputs down.
    pub fn run(&mut self, stop: &AtomicBool, hardware_channels: usize) {
        self.service.start(hardware_channels, &mut self.sink);
        info!("Control loop running, tick={}ms", self.tick_ms);

        let mut boundary = self.clock.now();
        while !stop.load(Ordering::SeqCst) {
            let started = self.clock.now();
            self.run_once(started);

            let now = self.clock.now();
            let next = next_deadline(boundary, now, self.tick_ms);
            let skipped = next.millis_since(boundary) / self.tick_ms - 1;
            if skipped > 0 {
                warn!("Tick overran, {} boundary(ies) skipped", skipped);
            }
            self.sleep_until(next, stop);
            boundary = next;
        }

        info!("Stop requested");
        self.service.shutdown(&mut self.hw, &mut self.sink);
    }

    fn sleep_until(&self, deadline: Timestamp, stop: &AtomicBool) {
        loop {
            let remaining = deadline.millis_since(self.clock.now());
            if remaining == 0 || stop.load(Ordering::SeqCst) {
                return;
            }
            std::thread::sleep(Duration::from_millis(remaining.min(MAX_SLEEP_SLICE_MS)));
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn service(&self) -> &AppService {
        &self.service
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn reading_log(&self) -> &L {
        &self.log
    }
}
