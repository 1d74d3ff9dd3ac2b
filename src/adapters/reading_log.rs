//! Append-only reading history, one JSON object per line.
//!
//! ```text
//! {"timestamp":"2024-05-01T12:00:00.000Z","channel":"Temp Forno","value":351.2,"kind":"temperature","source":"simulated"}
//! ```
//!
//! The wall-clock stamp comes from `chrono`; the record's monotonic
//! timestamp is not written.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use log::info;
use serde::Serialize;

use crate::app::ports::{ReadingLog, ReadingRecord};
use crate::error::StorageError;

#[derive(Serialize)]
struct Row<'a> {
    timestamp: String,
    #[serde(flatten)]
    record: &'a ReadingRecord<'a>,
}

pub struct JsonlReadingLog<W: Write> {
    out: W,
}

impl JsonlReadingLog<BufWriter<File>> {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        info!("Reading log: appending to {}", path.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonlReadingLog<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_row(&mut self, record: &ReadingRecord<'_>, at: DateTime<Utc>) -> Result<(), StorageError> {
        let row = Row {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            record,
        };
        let mut line = serde_json::to_vec(&row).map_err(|_| StorageError::Encode)?;
        line.push(b'\n');
        self.out.write_all(&line)?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> ReadingLog for JsonlReadingLog<W> {
    fn append(&mut self, record: &ReadingRecord<'_>) -> Result<(), StorageError> {
        self.write_row(record, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{ChannelKind, ReadingSource};
    use crate::state::Timestamp;
    use chrono::TimeZone;

    #[test]
    fn writes_one_line_per_record() {
        let mut log = JsonlReadingLog::new(Vec::new());
        let record = ReadingRecord {
            channel_id: "Temp Forno",
            value: 351.2,
            kind: ChannelKind::Temperature,
            source: ReadingSource::Simulated,
            timestamp: Timestamp::from_millis(42),
        };
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        log.write_row(&record, at).unwrap();
        log.append(&record).unwrap();

        let text = String::from_utf8(log.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let row: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(row["timestamp"], "2024-05-01T12:00:00.000Z");
        assert_eq!(row["channel"], "Temp Forno");
        assert_eq!(row["value"], 351.2);
        assert_eq!(row["kind"], "temperature");
        assert_eq!(row["source"], "simulated");
    }
}
