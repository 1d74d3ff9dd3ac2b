//! Fuzz target: `InboundCommand::from_json` → `AppService::handle_command`
//!
//! Feeds arbitrary bytes through the command decoder and applies every
//! command that decodes to a fresh service.  Neither step may panic, and
//! a `SET_SETTING` that is rejected must leave the settings untouched.
//!
//! cargo fuzz run fuzz_command_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;

use furnace::app::commands::InboundCommand;
use furnace::app::events::AppEvent;
use furnace::app::ports::{EventSink, SettingsStore};
use furnace::app::service::AppService;
use furnace::error::Result;
use furnace::settings::ControlSettings;

struct NullStore;

impl SettingsStore for NullStore {
    fn load(&self) -> Result<ControlSettings> {
        Ok(ControlSettings::default())
    }

    fn save(&self, _settings: &ControlSettings) -> Result<()> {
        Ok(())
    }
}

struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &AppEvent) {}
}

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(cmd) = InboundCommand::from_json(text) else {
        return;
    };

    let mut app = AppService::new(ControlSettings::default(), 5000);
    let before = app.state().settings.clone();
    let rejected = matches!(cmd, InboundCommand::SetSetting { .. })
        && app.handle_command(cmd, &NullStore, &mut NullSink).is_err();
    if rejected {
        assert_eq!(app.state().settings, before, "rejected setting mutated state");
    }
});
