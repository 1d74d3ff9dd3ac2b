//! Function-pointer state machine for the automatic heating policy.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  RegimeTable                                             │
//! │  ┌──────────┬───────────┬──────────┬──────────────────┐  │
//! │  │ Regime   │ on_enter  │ on_exit  │ on_update        │  │
//! │  ├──────────┼───────────┼──────────┼──────────────────┤  │
//! │  │ Disabled │ fn(ctx)   │ -        │ fn(&mut ctx)     │  │
//! │  │ BelowMin │ fn(ctx)   │ fn(ctx)  │ fn(&mut ctx)     │  │
//! │  │ InRange  │ fn(ctx)   │ -        │ fn(&mut ctx)     │  │
//! │  │ AboveMax │ fn(ctx)   │ -        │ fn(&mut ctx)     │  │
//! │  └──────────┴───────────┴──────────┴──────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Unlike a classic FSM the regime is not sticky: it is re-derived from
//! the settings and the furnace reading on every tick, in precedence
//! order (see [`Regime::classify`]).  All memory lives in the
//! [`ActuatorSet`] and [`Timers`] passed in, which makes [`step`] a pure
//! function.  [`Fsm`] wraps it to track the regime across ticks so
//! transitions can be logged and reported.

pub mod context;
pub mod states;

use std::collections::BTreeMap;

use log::info;
use serde::Serialize;

use crate::sensors::FURNACE_CHANNEL;
use crate::settings::ControlSettings;
use crate::state::{ActuatorSet, Timers, Timestamp};
use context::StepContext;

// ---------------------------------------------------------------------------
// Regime identity
// ---------------------------------------------------------------------------

/// The four regimes of the heating policy.
/// Must stay in sync with [`states::build_regime_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum Regime {
    Disabled = 0,
    BelowMin = 1,
    InRange = 2,
    AboveMax = 3,
}

impl Regime {
    /// Total number of regimes: used to size the table array.
    pub const COUNT: usize = 4;

    /// Derive the regime for this tick.
    ///
    /// Precedence: heating disabled or no furnace reading, then
    /// `T < temp_min`, then `T > temp_max`, else in range.
    pub fn classify(settings: &ControlSettings, furnace_temp: Option<f64>) -> Self {
        match furnace_temp {
            _ if !settings.heating_enabled => Self::Disabled,
            None => Self::Disabled,
            Some(t) if t < settings.temp_min => Self::BelowMin,
            Some(t) if t > settings.temp_max => Self::AboveMax,
            Some(_) => Self::InRange,
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` hooks.  Observational only:
/// they run on regime changes and may not alter outputs.
pub type RegimeHookFn = fn(&StepContext<'_>);

/// Signature for the per-tick update handler.
pub type RegimeUpdateFn = fn(&mut StepContext<'_>);

/// Static descriptor for a single regime.
pub struct RegimeDescriptor {
    pub id: Regime,
    pub name: &'static str,
    pub on_enter: Option<RegimeHookFn>,
    pub on_exit: Option<RegimeHookFn>,
    pub on_update: RegimeUpdateFn,
}

const REGIME_TABLE: [RegimeDescriptor; Regime::COUNT] = states::build_regime_table();

/// Furnace-zone temperature from the value table, if present and finite.
pub fn furnace_temperature(values: &BTreeMap<String, f64>) -> Option<f64> {
    values.get(FURNACE_CHANNEL).copied().filter(|t| t.is_finite())
}

/// One tick of the automatic policy.
///
/// Pure: the result depends only on the arguments.  `previous` is needed
/// because the in-range regime holds the last outputs unchanged.
pub fn step(
    settings: &ControlSettings,
    values: &BTreeMap<String, f64>,
    previous: &ActuatorSet,
    timers: &Timers,
    now: Timestamp,
) -> (ActuatorSet, Timers) {
    let furnace = furnace_temperature(values);
    let regime = Regime::classify(settings, furnace);
    let mut ctx = StepContext::new(settings, furnace, *previous, *timers, now);
    (REGIME_TABLE[regime as usize].on_update)(&mut ctx);
    (ctx.actuators, ctx.timers)
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Result of [`Fsm::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub regime: Regime,
    pub actuators: ActuatorSet,
    pub timers: Timers,
    /// `Some((from, to))` when the regime differs from the last
    /// automatic tick.  `from` is `None` on the first tick after start
    /// or after a [`suspend`](Fsm::suspend).
    pub transition: Option<(Option<Regime>, Regime)>,
}

/// Tracks the regime across ticks and runs the enter/exit hooks.
pub struct Fsm {
    table: [RegimeDescriptor; Regime::COUNT],
    current: Option<Regime>,
    /// Automatic ticks evaluated since startup.
    tick_count: u64,
    /// Tick at which the current regime was entered.
    regime_entry_tick: u64,
}

impl Default for Fsm {
    fn default() -> Self {
        Self::new()
    }
}

impl Fsm {
    pub fn new() -> Self {
        Self {
            table: states::build_regime_table(),
            current: None,
            tick_count: 0,
            regime_entry_tick: 0,
        }
    }

    /// Evaluate one automatic tick.  Same outputs as [`step`].
    pub fn step(
        &mut self,
        settings: &ControlSettings,
        values: &BTreeMap<String, f64>,
        previous: &ActuatorSet,
        timers: &Timers,
        now: Timestamp,
    ) -> StepOutcome {
        self.tick_count += 1;
        let furnace = furnace_temperature(values);
        let regime = Regime::classify(settings, furnace);
        let mut ctx = StepContext::new(settings, furnace, *previous, *timers, now);

        let transition = if self.current == Some(regime) {
            None
        } else {
            let from = self.current;
            self.transition(from, regime, &ctx);
            Some((from, regime))
        };

        (self.table[regime as usize].on_update)(&mut ctx);

        StepOutcome {
            regime,
            actuators: ctx.actuators,
            timers: ctx.timers,
            transition,
        }
    }

    /// Forget the current regime (manual mode took over).  The next
    /// automatic tick reports a fresh entry.
    pub fn suspend(&mut self) {
        if let Some(regime) = self.current.take() {
            info!("FSM suspended in regime: {}", self.table[regime as usize].name);
        }
    }

    pub fn current_regime(&self) -> Option<Regime> {
        self.current
    }

    /// How many automatic ticks the FSM has spent in the current regime.
    pub fn ticks_in_current_regime(&self) -> u64 {
        self.tick_count - self.regime_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, from: Option<Regime>, to: Regime, ctx: &StepContext<'_>) {
        match from {
            Some(r) => info!(
                "FSM transition: {} -> {} after {} tick(s)",
                self.table[r as usize].name,
                self.table[to as usize].name,
                self.ticks_in_current_regime()
            ),
            None => info!("FSM transition: (none) -> {}", self.table[to as usize].name),
        }

        if let Some(exit) = from.and_then(|r| self.table[r as usize].on_exit) {
            exit(ctx);
        }

        self.current = Some(to);
        self.regime_entry_tick = self.tick_count;

        if let Some(enter) = self.table[to as usize].on_enter {
            enter(ctx);
        }
    }
}
