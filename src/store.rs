//! ==============================================================================
//! store.rs - shared record file
//! ==============================================================================
//!
//! purpose:
//!     keeps the latest reading on disk so it survives restarts.
//!     the ingest task overwrites it on every Longitude line and the host
//!     reads it once at startup to seed the dashboard.
//!
//! format:
//!     {"condition": "...", "lat": "...", "lon": "..."}  (all strings)
//!
//! ==============================================================================

use crate::domain::LatestReading;

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// read the persisted reading
    ///
    /// a missing or unparseable file is the empty reading, never an error.
    pub fn load(&self) -> LatestReading {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!("[STORE] No record at {}: {}", self.path.display(), e);
                return LatestReading::empty();
            }
        };

        match serde_json::from_str(&content) {
            Ok(reading) => reading,
            Err(e) => {
                tracing::warn!("[STORE] Ignoring invalid record {}: {}", self.path.display(), e);
                LatestReading::empty()
            }
        }
    }

    /// overwrite the file with `reading`
    ///
    /// the json goes to a sibling temp file first and is renamed over the
    /// target, so readers see either the old or the new record.
    pub fn save(&self, reading: &LatestReading) -> Result<()> {
        let json = serde_json::to_string(reading)?;
        let tmp = self.tmp_path();

        std::fs::write(&tmp, json)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}
