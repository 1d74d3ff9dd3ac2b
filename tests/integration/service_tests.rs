//! Integration tests for the AppService → FSM → actuators pipeline.
//!
//! These run on the host and drive the service tick by tick against
//! the mock adapters, checking actuator output, timers, events and
//! persistence.

use serde_json::json;

use furnace::app::commands::{CommandOutcome, IgnoreReason, InboundCommand};
use furnace::app::events::AppEvent;
use furnace::app::service::AppService;
use furnace::error::{Error, SettingsError};
use furnace::fsm::Regime;
use furnace::settings::{ControlSettings, SystemMode};
use furnace::state::{ActuatorSet, Timestamp};

use crate::mock_hw::{ActuatorCall, MockHardware, MockSettingsStore, RecordingSink, VecReadingLog};

const LOG_INTERVAL_MS: u64 = 5000;

struct Rig {
    app: AppService,
    hw: MockHardware,
    sink: RecordingSink,
    log: VecReadingLog,
    store: MockSettingsStore,
}

impl Rig {
    fn new(settings: ControlSettings, furnace: f64) -> Self {
        let mut app = AppService::new(settings, LOG_INTERVAL_MS);
        let mut sink = RecordingSink::new();
        app.start(1, &mut sink);
        Self {
            app,
            hw: MockHardware::with_furnace(furnace),
            sink,
            log: VecReadingLog::new(),
            store: MockSettingsStore::new(),
        }
    }

    fn heating(furnace: f64) -> Self {
        let settings = ControlSettings {
            heating_enabled: true,
            ..ControlSettings::default()
        };
        Self::new(settings, furnace)
    }

    fn manual() -> Self {
        let settings = ControlSettings {
            system_mode: SystemMode::Manual,
            ..ControlSettings::default()
        };
        Self::new(settings, 350.0)
    }

    fn tick(&mut self, at_ms: u64) {
        self.app.tick(Timestamp::from_millis(at_ms), &mut self.hw, &mut self.sink, &mut self.log);
    }

    fn command(&mut self, cmd: InboundCommand) -> furnace::error::Result<CommandOutcome> {
        self.app.handle_command(cmd, &self.store, &mut self.sink)
    }

    fn actuators(&self) -> ActuatorSet {
        self.app.state().actuators
    }
}

// ── Heating episode scenario ──────────────────────────────────

#[test]
fn cold_furnace_starts_blower_and_resistor() {
    let mut rig = Rig::heating(200.0);
    rig.tick(0);

    let a = rig.actuators();
    assert!(a.blower && a.resistor && a.auger);
    assert_eq!(rig.app.state().timers.resistor_start, Some(Timestamp::ZERO));
    assert_eq!(rig.app.regime(), Some(Regime::BelowMin));
    assert_eq!(rig.hw.last_applied(), Some(a));
}

#[test]
fn resistor_burst_ends_but_blower_stays() {
    let mut rig = Rig::heating(200.0);
    rig.tick(0);
    rig.tick(11_000);

    let a = rig.actuators();
    assert!(a.blower);
    assert!(!a.resistor);
    assert_eq!(rig.app.state().timers.resistor_start, Some(Timestamp::ZERO));
}

#[test]
fn overheat_clears_everything() {
    let mut rig = Rig::heating(200.0);
    rig.tick(0);
    rig.tick(11_000);
    rig.hw.set_furnace(420.0);
    rig.tick(11_100);

    let a = rig.actuators();
    assert!(!a.blower && !a.resistor && !a.auger);
    assert!(rig.app.state().timers.is_idle());
    assert_eq!(
        rig.sink.regime_changes(),
        vec![(None, Regime::BelowMin), (Some(Regime::BelowMin), Regime::AboveMax)]
    );
}

#[test]
fn in_range_holds_previous_outputs() {
    let mut rig = Rig::heating(200.0);
    rig.tick(0);
    let before = rig.actuators();
    let timers = rig.app.state().timers;

    rig.hw.set_furnace(350.0);
    rig.tick(100);
    assert_eq!(rig.actuators(), before);
    assert_eq!(rig.app.state().timers, timers);
    assert_eq!(rig.app.regime(), Some(Regime::InRange));
}

#[test]
fn in_range_excursion_does_not_rearm_resistor() {
    let mut rig = Rig::heating(200.0);
    rig.tick(0);
    rig.hw.set_furnace(350.0);
    rig.tick(4_000);
    assert!(rig.actuators().resistor, "hold keeps the burst running");

    rig.hw.set_furnace(200.0);
    rig.tick(6_000);
    assert!(rig.actuators().resistor, "burst continues from the original start");
    rig.tick(11_000);
    assert!(!rig.actuators().resistor);

    rig.hw.set_furnace(350.0);
    rig.tick(12_000);
    rig.hw.set_furnace(200.0);
    rig.tick(13_000);
    let a = rig.actuators();
    assert!(a.blower && !a.resistor, "same episode, burst already spent");
    assert_eq!(rig.app.state().timers.resistor_start, Some(Timestamp::ZERO));
}

#[test]
fn missing_furnace_reading_disables_heating() {
    let mut rig = Rig::heating(200.0);
    rig.tick(0);
    rig.hw.remove_furnace();
    rig.tick(100);
    assert_eq!(rig.actuators(), ActuatorSet::all_off());
    assert_eq!(rig.app.regime(), Some(Regime::Disabled));
}

#[test]
fn every_tick_broadcasts_one_snapshot() {
    let mut rig = Rig::heating(200.0);
    for i in 0..5 {
        rig.tick(i * 100);
    }
    assert_eq!(rig.sink.snapshots().len(), 5);
    let last = rig.sink.snapshots()[4];
    assert_eq!(last.values.get("Pressão Gases"), Some(&2.0));
}

// ── MANUAL_CONTROL ────────────────────────────────────────────

#[test]
fn manual_control_in_automatic_mode_is_a_no_op() {
    let mut rig = Rig::heating(350.0);
    rig.tick(0);
    let before = rig.actuators();

    let outcome = rig
        .command(InboundCommand::ManualControl {
            target: "blower".into(),
            state: true,
        })
        .unwrap();
    assert_eq!(outcome, CommandOutcome::Ignored(IgnoreReason::NotInManualMode));
    assert_eq!(rig.actuators(), before);
    assert!(
        rig.sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::CommandIgnored { reason: IgnoreReason::NotInManualMode, .. }))
    );
}

#[test]
fn manual_mode_sets_outputs_verbatim() {
    let mut rig = Rig::manual();
    rig.command(InboundCommand::ManualControl {
        target: "tambor_pul".into(),
        state: true,
    })
    .unwrap();
    rig.command(InboundCommand::ManualControl {
        target: "resistor".into(),
        state: true,
    })
    .unwrap();
    rig.tick(0);

    let a = rig.actuators();
    assert!(a.drum_pulse && a.resistor);
    assert!(!a.blower);
    assert_eq!(rig.app.regime(), None, "state machine must not run in manual mode");
    assert!(matches!(
        rig.hw.calls.last(),
        Some(ActuatorCall::Apply { drum_step_rate: 500, .. })
    ));
}

#[test]
fn unknown_target_is_ignored() {
    let mut rig = Rig::manual();
    let outcome = rig
        .command(InboundCommand::ManualControl {
            target: "flux_capacitor".into(),
            state: true,
        })
        .unwrap();
    assert_eq!(outcome, CommandOutcome::Ignored(IgnoreReason::UnknownTarget));
    assert_eq!(rig.actuators(), ActuatorSet::all_off());
}

// ── SET_SETTING ───────────────────────────────────────────────

#[test]
fn zero_resistor_duration_is_coerced_to_one() {
    let mut rig = Rig::heating(200.0);
    rig.command(InboundCommand::SetSetting {
        name: "resistor_on_duration".into(),
        value: json!(0),
    })
    .unwrap();
    assert_eq!(rig.app.state().settings.resistor_on_duration, 1);
    let saved = rig.store.stored.borrow().clone().unwrap();
    assert_eq!(saved.resistor_on_duration, 1);
}

#[test]
fn setting_change_is_persisted_and_announced() {
    let mut rig = Rig::heating(200.0);
    rig.command(InboundCommand::SetSetting {
        name: "rosca_on_timer".into(),
        value: json!(7),
    })
    .unwrap();
    assert_eq!(rig.store.saves.get(), 1);
    assert_eq!(rig.app.state().settings.auger_on_duration, 7);
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::SettingChanged { name, persisted: true } if name == "rosca_on_timer"
    )));
}

#[test]
fn save_failure_keeps_in_memory_change() {
    let mut rig = Rig::heating(200.0);
    rig.store.fail_saves.set(true);

    let result = rig.command(InboundCommand::SetSetting {
        name: "temp_min".into(),
        value: json!(250),
    });
    assert!(matches!(result, Err(Error::Storage(_))));
    assert_eq!(rig.app.state().settings.temp_min, 250.0);
    assert!(rig.sink.events.iter().any(|e| matches!(e, AppEvent::SettingChanged { persisted: false, .. })));
}

#[test]
fn ill_typed_value_changes_nothing() {
    let mut rig = Rig::heating(200.0);
    let before = rig.app.state().settings.clone();
    let result = rig.command(InboundCommand::SetSetting {
        name: "temp_max".into(),
        value: json!("hot"),
    });
    assert!(matches!(result, Err(Error::Settings(SettingsError::InvalidValue(_)))));
    assert_eq!(rig.app.state().settings, before);
    assert_eq!(rig.store.saves.get(), 0);
}

#[test]
fn switching_to_manual_freezes_outputs() {
    let mut rig = Rig::heating(200.0);
    rig.tick(0);
    let running = rig.actuators();
    rig.command(InboundCommand::SetSetting {
        name: "system_mode".into(),
        value: json!(1),
    })
    .unwrap();
    rig.hw.set_furnace(450.0);
    rig.tick(100);
    assert_eq!(rig.actuators(), running);
}

#[test]
fn disabling_heating_in_manual_mode_clears_timers() {
    let mut rig = Rig::heating(200.0);
    rig.tick(0);
    rig.command(InboundCommand::SetSetting {
        name: "system_mode".into(),
        value: json!("manual"),
    })
    .unwrap();
    assert!(!rig.app.state().timers.is_idle());

    rig.command(InboundCommand::SetSetting {
        name: "heating_enabled".into(),
        value: json!(false),
    })
    .unwrap();
    assert!(rig.app.state().timers.is_idle());
    rig.tick(100);
    assert!(rig.sink.snapshots().last().unwrap().timers.is_idle());
}

#[test]
fn full_update_request_broadcasts() {
    let mut rig = Rig::heating(200.0);
    let outcome = rig.command(InboundCommand::RequestFullUpdate).unwrap();
    assert_eq!(outcome, CommandOutcome::Broadcast);
    assert_eq!(rig.sink.snapshots().len(), 1);
}

// ── Reading log ───────────────────────────────────────────────

#[test]
fn reading_log_is_rate_limited_per_channel() {
    let mut rig = Rig::heating(200.0);
    for i in 0..=100 {
        rig.tick(i * 100); // 0 .. 10 s
    }
    // Admitted at 0 s, 5 s and 10 s.
    assert_eq!(rig.log.rows_for(furnace::sensors::FURNACE_CHANNEL), 3);
    assert_eq!(rig.log.rows_for("Pressão Gases"), 3);
}

#[test]
fn reading_log_failure_does_not_stop_ticks() {
    let mut rig = Rig::heating(200.0);
    rig.log.fail = true;
    rig.tick(0);
    rig.tick(100);
    assert_eq!(rig.app.tick_count(), 2);
    assert_eq!(rig.sink.snapshots().len(), 2);
}

// ── Shutdown ──────────────────────────────────────────────────

#[test]
fn shutdown_turns_off_before_release() {
    let mut rig = Rig::heating(200.0);
    rig.tick(0);
    rig.app.shutdown(&mut rig.hw, &mut rig.sink);

    let n = rig.hw.calls.len();
    assert_eq!(&rig.hw.calls[n - 2..], &[ActuatorCall::AllOff, ActuatorCall::Release]);
    assert!(matches!(rig.sink.events.last(), Some(AppEvent::Stopped)));
}
