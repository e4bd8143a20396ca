//! Single-snapshot persistence between collector runs.
//!
//! The previous run's counters are kept in one JSON document:
//!
//! ```text
//! { "throughput.vda.read": 7102746112, ..., "_lastTime": 1700000000 }
//! ```
//!
//! The capture timestamp lives next to the counters under the reserved
//! `_lastTime` key. Writes go through a temporary file in the same directory
//! followed by a rename, so a reader never observes a partially written
//! document.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use super::model::{CounterSnapshot, Counters};

/// Error type for snapshot persistence.
#[derive(Debug)]
pub enum StoreError {
    /// Reading or writing the snapshot file failed.
    Io(io::Error),
    /// The snapshot file exists but is not a valid snapshot document.
    Decode(serde_json::Error),
    /// The snapshot could not be serialized.
    Encode(serde_json::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "I/O error: {}", e),
            StoreError::Decode(e) => write!(f, "corrupt snapshot: {}", e),
            StoreError::Encode(e) => write!(f, "cannot encode snapshot: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            StoreError::Decode(e) | StoreError::Encode(e) => Some(e),
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

/// On-disk layout: counters and the reserved `_lastTime` key (capture time,
/// Unix seconds) share one flat object.
#[derive(Serialize, Deserialize)]
struct Persisted {
    #[serde(rename = "_lastTime")]
    last_time: f64,
    #[serde(flatten)]
    counters: BTreeMap<String, f64>,
}

/// Owns the file holding the previous run's snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the previous snapshot.
    ///
    /// Returns `Ok(None)` on the first run, when no snapshot file exists yet.
    pub fn load(&self) -> Result<Option<CounterSnapshot>, StoreError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no previous snapshot");
                return Ok(None);
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        let persisted: Persisted = serde_json::from_slice(&data).map_err(StoreError::Decode)?;
        let captured_at = unix_seconds(persisted.last_time).map_err(StoreError::Decode)?;
        Ok(Some(CounterSnapshot::new(
            captured_at,
            Counters::from(persisted.counters),
        )))
    }

    /// Replaces the stored snapshot.
    pub fn save(&self, snapshot: &CounterSnapshot) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let persisted = Persisted {
            last_time: snapshot.captured_at as f64,
            counters: snapshot.counters.clone().into(),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut writer, &persisted).map_err(StoreError::Encode)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        debug!(
            path = %self.path.display(),
            counters = snapshot.counters.len(),
            "snapshot saved"
        );
        Ok(())
    }
}

/// Converts a persisted `_lastTime` to whole seconds, rejecting values an
/// `i64` cannot hold instead of saturating them.
fn unix_seconds(last_time: f64) -> Result<i64, serde_json::Error> {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range.
    if last_time.is_finite() && last_time >= i64::MIN as f64 && last_time < i64::MAX as f64 {
        Ok(last_time as i64)
    } else {
        Err(serde::de::Error::custom(format!(
            "_lastTime out of range: {}",
            last_time
        )))
    }
}
