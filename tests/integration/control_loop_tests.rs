//! Integration tests for the control loop driver: command draining,
//! fixed-period ticking and shutdown ordering.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::json;

use furnace::adapters::time::MonotonicClock;
use furnace::app::commands::InboundCommand;
use furnace::app::events::AppEvent;
use furnace::app::queue::CommandQueue;
use furnace::app::service::AppService;
use furnace::driver::ControlLoop;
use furnace::settings::{ControlSettings, SystemMode};
use furnace::state::Timestamp;

use crate::mock_hw::{ActuatorCall, MockHardware, MockSettingsStore, RecordingSink, SteppingClock, VecReadingLog};

type TestLoop<C> = ControlLoop<MockHardware, RecordingSink, MockSettingsStore, VecReadingLog, C>;

fn make_loop<C: furnace::app::ports::Clock>(
    settings: ControlSettings,
    store: MockSettingsStore,
    clock: C,
    tick_ms: u32,
) -> (TestLoop<C>, Arc<CommandQueue>) {
    let queue = Arc::new(CommandQueue::new());
    let control = ControlLoop::new(
        AppService::new(settings, 5000),
        MockHardware::with_furnace(200.0),
        RecordingSink::new(),
        store,
        VecReadingLog::new(),
        clock,
        Arc::clone(&queue),
        tick_ms,
    );
    (control, queue)
}

#[test]
fn queued_commands_apply_before_the_tick() {
    let (mut control, queue) = make_loop(
        ControlSettings::default(),
        MockSettingsStore::new(),
        SteppingClock::new(100),
        100,
    );
    queue.submit(InboundCommand::SetSetting {
        name: "system_mode".into(),
        value: json!("manual"),
    });
    queue.submit(InboundCommand::ManualControl {
        target: "ventilador".into(),
        state: true,
    });

    control.run_once(Timestamp::ZERO);

    assert!(queue.is_empty());
    let snaps = control.sink().snapshots();
    assert_eq!(snaps.len(), 1, "one snapshot per tick, none mid-drain");
    assert_eq!(snaps[0].settings.system_mode, SystemMode::Manual);
    assert!(snaps[0].actuators.blower);
    assert_eq!(control.hardware().last_applied().map(|a| a.blower), Some(true));
}

#[test]
fn failing_command_does_not_abort_the_tick() {
    let (mut control, queue) = make_loop(
        ControlSettings::default(),
        MockSettingsStore::failing(),
        SteppingClock::new(100),
        100,
    );
    queue.submit(InboundCommand::SetSetting {
        name: "heating_enabled".into(),
        value: json!(true),
    });
    control.run_once(Timestamp::ZERO);

    assert_eq!(control.service().tick_count(), 1);
    assert!(control.service().state().settings.heating_enabled);
    assert!(control.service().state().actuators.blower);
}

#[test]
fn stop_before_start_still_shuts_down_in_order() {
    let (mut control, _queue) = make_loop(
        ControlSettings::default(),
        MockSettingsStore::new(),
        SteppingClock::new(100),
        100,
    );
    let stop = AtomicBool::new(true);
    control.run(&stop, 0);

    assert_eq!(control.hardware().calls, vec![ActuatorCall::AllOff, ActuatorCall::Release]);
    assert!(matches!(control.sink().events.first(), Some(AppEvent::Started { .. })));
    assert!(matches!(control.sink().events.last(), Some(AppEvent::Stopped)));
}

#[test]
fn runs_until_stopped_then_outputs_off() {
    let settings = ControlSettings {
        heating_enabled: true,
        ..ControlSettings::default()
    };
    let (mut control, _queue) = make_loop(settings, MockSettingsStore::new(), MonotonicClock::new(), 5);
    let stop = Arc::new(AtomicBool::new(false));
    let stopper = {
        let stop = Arc::clone(&stop);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(60));
            stop.store(true, Ordering::SeqCst);
        })
    };

    control.run(&stop, 1);
    stopper.join().unwrap();

    let calls = &control.hardware().calls;
    assert!(control.service().tick_count() >= 2);
    let n = calls.len();
    assert_eq!(&calls[n - 2..], &[ActuatorCall::AllOff, ActuatorCall::Release]);
    assert!(
        calls[..n - 2].iter().all(|c| matches!(c, ActuatorCall::Apply { .. })),
        "nothing but ticks before shutdown"
    );
}
