//! File-backed settings store.
//!
//! Implements [`SettingsStore`] over a single pretty-printed JSON
//! document.  Saves go to a sibling temp file that is then renamed over
//! the target, so a crash mid-write leaves the previous document intact.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::app::ports::SettingsStore;
use crate::error::{Result, SettingsError, StorageError};
use crate::settings::ControlSettings;

pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Result<ControlSettings> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("JsonSettingsStore: {} not found, using defaults", self.path.display());
                return Ok(ControlSettings::default());
            }
            Err(e) => return Err(StorageError::from(e).into()),
        };
        let settings: ControlSettings = serde_json::from_str(&text).map_err(SettingsError::from)?;
        info!("JsonSettingsStore: loaded {}", self.path.display());
        Ok(settings)
    }

    fn save(&self, settings: &ControlSettings) -> Result<()> {
        let body = serde_json::to_vec_pretty(settings).map_err(|_| StorageError::Encode)?;
        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp).map_err(StorageError::from)?;
            file.write_all(&body).map_err(StorageError::from)?;
            file.write_all(b"\n").map_err(StorageError::from)?;
            file.sync_all().map_err(StorageError::from)?;
        }
        fs::rename(&tmp, &self.path).map_err(StorageError::from)?;
        debug!("JsonSettingsStore: saved {} bytes to {}", body.len(), self.path.display());
        Ok(())
    }
}
