//! JSON-lines transport between the control loop and a panel process.
//!
//! ```text
//!  stdin  ──▶ reader thread ──▶ CommandQueue ──▶ control loop
//!  stdout ◀── JsonLinesSink ◀── AppEvent::Snapshot
//! ```
//!
//! Inbound lines are [`InboundCommand`] documents.  Outbound lines are
//! `{"event":"state_update","data":<SystemState>}`.  Only snapshots are
//! written; other events are for the log.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::app::commands::InboundCommand;
use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::app::queue::CommandQueue;
use crate::state::SystemState;

#[derive(Serialize)]
struct Outbound<'a> {
    event: &'static str,
    data: &'a SystemState,
}

/// [`EventSink`] that writes each snapshot as one JSON line.
pub struct JsonLinesSink<W: Write> {
    out: W,
    broken: bool,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, broken: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, state: &SystemState) -> std::io::Result<()> {
        let msg = Outbound {
            event: "state_update",
            data: state,
        };
        serde_json::to_writer(&mut self.out, &msg)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn emit(&mut self, event: &AppEvent) {
        let AppEvent::Snapshot(state) = event else {
            return;
        };
        if self.broken {
            return;
        }
        if let Err(e) = self.write_line(state) {
            // A closed pipe stays closed; stop trying.
            error!("Event stream write failed, snapshots disabled: {}", e);
            self.broken = true;
        }
    }
}

/// Decode command lines from `reader` into `queue` until EOF.
/// Returns the number of commands accepted.
pub fn pump_commands(reader: impl BufRead, queue: &CommandQueue) -> usize {
    let mut accepted = 0;
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Command stream read failed: {}", e);
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match InboundCommand::from_json(trimmed) {
            Ok(cmd) => {
                debug!("Command received: {:?}", cmd);
                if queue.submit(cmd) {
                    accepted += 1;
                }
            }
            Err(e) => warn!("Undecodable command dropped ({}): {}", e, trimmed),
        }
    }
    accepted
}

/// Spawn a thread that feeds stdin into `queue`.
pub fn spawn_stdin_reader(queue: Arc<CommandQueue>) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("stdin-commands".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            let n = pump_commands(stdin.lock(), &queue);
            info!("Command stream closed after {} command(s)", n);
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ControlSettings;

    #[test]
    fn snapshot_written_as_state_update() {
        let mut sink = JsonLinesSink::new(Vec::new());
        let state = SystemState::new(ControlSettings::default());
        sink.emit(&AppEvent::Snapshot(Box::new(state)));
        sink.emit(&AppEvent::Stopped);

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text.lines().count(), 1);
        let v: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(v["event"], "state_update");
        assert_eq!(v["data"]["actuators"]["blower"], false);
        assert_eq!(v["data"]["settings"]["temp_min"], 300.0);
        assert!(v["data"]["timers"]["resistor_start"].is_null());
    }

    #[test]
    fn pump_skips_garbage_and_blank_lines() {
        let input = concat!(
            "{\"command\":\"REQUEST_FULL_UPDATE\"}\n",
            "\n",
            "not json\n",
            "{\"command\":\"SET_SETTING\",\"payload\":{\"name\":\"temp_min\",\"value\":250}}\n",
        );
        let queue = CommandQueue::new();
        assert_eq!(pump_commands(input.as_bytes(), &queue), 2);
        let cmds = queue.drain();
        assert_eq!(cmds[0], InboundCommand::RequestFullUpdate);
        assert!(matches!(&cmds[1], InboundCommand::SetSetting { name, .. } if name == "temp_min"));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn broken_pipe_does_not_panic() {
        let mut sink = JsonLinesSink::new(ClosedPipe);
        let state = SystemState::new(ControlSettings::default());
        sink.emit(&AppEvent::Snapshot(Box::new(state.clone())));
        sink.emit(&AppEvent::Snapshot(Box::new(state)));
        assert!(sink.broken);
    }
}
