//! File-backed settings store and JSON-lines transport end to end.

use std::fs;
use std::path::PathBuf;

use serde_json::{Value, json};

use furnace::adapters::json_store::JsonSettingsStore;
use furnace::adapters::stdio_transport::{JsonLinesSink, pump_commands};
use furnace::app::ports::SettingsStore;
use furnace::app::queue::CommandQueue;
use furnace::app::service::AppService;
use furnace::settings::{ControlSettings, SystemMode};

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("furnace-it-{}-{}", name, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir.join("settings.json")
}

#[test]
fn legacy_document_loads_with_aliases() {
    let path = scratch("legacy");
    fs::write(
        &path,
        r#"{
            "system_mode": "manual",
            "heating_status": 1,
            "Temp Forno.temp_min": 280,
            "Temp Tanque.temp_max": 130,
            "resistencia_timer": 12.4,
            "rosca_off_timer": 0,
            "panel_theme": "dark"
        }"#,
    )
    .unwrap();

    let s = JsonSettingsStore::new(&path).load().unwrap();
    assert_eq!(s.system_mode, SystemMode::Manual);
    assert!(s.heating_enabled);
    assert_eq!(s.temp_min, 280.0);
    assert_eq!(s.zones["Temp Tanque"].temp_max, 130.0);
    assert_eq!(s.resistor_on_duration, 12);
    assert_eq!(s.auger_off_duration, 1);
    assert_eq!(s.extra["panel_theme"], json!("dark"));
}

#[test]
fn set_setting_over_the_wire_reaches_the_file() {
    let path = scratch("wire");
    let _ = fs::remove_file(&path);
    let store = JsonSettingsStore::new(&path);
    let queue = CommandQueue::new();
    let input = "{\"command\":\"SET_SETTING\",\"payload\":{\"name\":\"temp_max\",\"value\":\"425\"}}\n";
    assert_eq!(pump_commands(input.as_bytes(), &queue), 1);

    let mut app = AppService::new(ControlSettings::default(), 5000);
    let mut sink = JsonLinesSink::new(Vec::new());
    for cmd in queue.drain() {
        app.handle_command(cmd, &store, &mut sink).unwrap();
    }

    let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk["temp_max"], json!(425.0));
    assert_eq!(store.load().unwrap().temp_max, 425.0);
}
