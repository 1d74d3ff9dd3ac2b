//! Concrete regime handlers and table builder.
//!
//! ```text
//!            heating off / no furnace reading
//!   any ────────────────────────────────────────▶ DISABLED (all off, timers reset)
//!
//!   T < min ──▶ BELOW_MIN   blower on
//!                           resistor: one burst per episode
//!                           auger:    on/off duty cycle
//!   T > max ──▶ ABOVE_MAX   all off, timers reset (next episode starts fresh)
//!   otherwise ▶ IN_RANGE    hold previous outputs and timers
//! ```
//!
//! Drum outputs belong to the operator and are never written here.

use log::info;

use super::context::StepContext;
use super::{Regime, RegimeDescriptor};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the regime table.
pub const fn build_regime_table() -> [RegimeDescriptor; Regime::COUNT] {
    [
        // Index 0: Disabled
        RegimeDescriptor {
            id: Regime::Disabled,
            name: "Disabled",
            on_enter: Some(disabled_enter),
            on_exit: None,
            on_update: disabled_update,
        },
        // Index 1: BelowMin
        RegimeDescriptor {
            id: Regime::BelowMin,
            name: "BelowMin",
            on_enter: Some(below_min_enter),
            on_exit: Some(below_min_exit),
            on_update: below_min_update,
        },
        // Index 2: InRange
        RegimeDescriptor {
            id: Regime::InRange,
            name: "InRange",
            on_enter: Some(in_range_enter),
            on_exit: None,
            on_update: in_range_update,
        },
        // Index 3: AboveMax
        RegimeDescriptor {
            id: Regime::AboveMax,
            name: "AboveMax",
            on_enter: Some(above_max_enter),
            on_exit: None,
            on_update: above_max_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  DISABLED
// ═══════════════════════════════════════════════════════════════════════════

fn disabled_enter(ctx: &StepContext<'_>) {
    if ctx.settings.heating_enabled {
        info!("DISABLED: no furnace reading, heating outputs off");
    } else {
        info!("DISABLED: heating switched off");
    }
}

fn disabled_update(ctx: &mut StepContext<'_>) {
    ctx.stand_down();
}

// ═══════════════════════════════════════════════════════════════════════════
//  BELOW_MIN: a heating episode
// ═══════════════════════════════════════════════════════════════════════════

fn below_min_enter(ctx: &StepContext<'_>) {
    info!(
        "BELOW_MIN: furnace {:.1}\u{00b0}C < {:.1}\u{00b0}C, resistor burst {}s, auger {}s/{}s",
        ctx.furnace_temp.unwrap_or(f64::NAN),
        ctx.settings.temp_min,
        ctx.settings.resistor_on_duration,
        ctx.settings.auger_on_duration,
        ctx.settings.auger_off_duration,
    );
}

fn below_min_exit(ctx: &StepContext<'_>) {
    info!(
        "BELOW_MIN: left at {:.1}\u{00b0}C",
        ctx.furnace_temp.unwrap_or(f64::NAN)
    );
}

fn below_min_update(ctx: &mut StepContext<'_>) {
    let now = ctx.now;
    ctx.actuators.blower = true;

    // One-shot: once the burst has elapsed the timer stays armed, so the
    // resistor stays off until AboveMax or Disabled disarms it.
    let burst_ms = u64::from(ctx.settings.resistor_on_duration) * 1000;
    let on_for = StepContext::elapsed_since_armed(now, &mut ctx.timers.resistor_start);
    ctx.actuators.resistor = on_for < burst_ms;

    let cycle_ms = ctx.settings.auger_cycle_millis();
    let on_ms = u64::from(ctx.settings.auger_on_duration) * 1000;
    let elapsed = StepContext::elapsed_since_armed(now, &mut ctx.timers.auger_cycle_start);
    ctx.actuators.auger = cycle_ms > 0 && elapsed % cycle_ms < on_ms;
}

// ═══════════════════════════════════════════════════════════════════════════
//  IN_RANGE: no rule; outputs and timers carry over
// ═══════════════════════════════════════════════════════════════════════════

fn in_range_enter(ctx: &StepContext<'_>) {
    info!(
        "IN_RANGE: furnace {:.1}\u{00b0}C within [{:.1}, {:.1}], holding outputs",
        ctx.furnace_temp.unwrap_or(f64::NAN),
        ctx.settings.temp_min,
        ctx.settings.temp_max,
    );
}

fn in_range_update(_ctx: &mut StepContext<'_>) {}

// ═══════════════════════════════════════════════════════════════════════════
//  ABOVE_MAX
// ═══════════════════════════════════════════════════════════════════════════

fn above_max_enter(ctx: &StepContext<'_>) {
    info!(
        "ABOVE_MAX: furnace {:.1}\u{00b0}C > {:.1}\u{00b0}C, heating outputs off",
        ctx.furnace_temp.unwrap_or(f64::NAN),
        ctx.settings.temp_max,
    );
}

fn above_max_update(ctx: &mut StepContext<'_>) {
    ctx.stand_down();
}
