//! Fuzz target: settings document parsing
//!
//! Any document that parses must serialise back to a document that
//! parses to the same settings, and every duration must be at least 1.
//!
//! cargo fuzz run fuzz_settings_document

#![no_main]

use libfuzzer_sys::fuzz_target;

use furnace::settings::ControlSettings;

fuzz_target!(|data: &[u8]| {
    let Ok(settings) = serde_json::from_slice::<ControlSettings>(data) else {
        return;
    };
    assert!(settings.resistor_on_duration >= 1);
    assert!(settings.auger_on_duration >= 1);
    assert!(settings.auger_off_duration >= 1);
    assert!(settings.drum_step_rate >= 1);

    let Ok(encoded) = serde_json::to_vec(&settings) else {
        return;
    };
    let reparsed: ControlSettings = serde_json::from_slice(&encoded).expect("re-parse");
    assert_eq!(reparsed, settings);
});
