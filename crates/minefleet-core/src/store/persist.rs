// ── Fleet data persistence ──
//
// JSON snapshot of the three collections, written atomically via a
// temp-file rename so a crash mid-write never truncates fleet data.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;
use crate::model::{ControlLogEntry, Device, PowerReading};

/// Serialized form of the whole fleet state.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct FleetSnapshot {
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub control_log: Vec<ControlLogEntry>,
    #[serde(default)]
    pub readings: Vec<PowerReading>,
}

/// Handle to the on-disk snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot. A missing file is an empty fleet, not an
    /// error; a present but unparseable file is.
    pub fn load(&self) -> Result<FleetSnapshot, CoreError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no fleet data file, starting empty");
            return Ok(FleetSnapshot::default());
        }

        let raw = fs::read_to_string(&self.path).map_err(|source| CoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| CoreError::Data {
            path: self.path.clone(),
            source,
        })
    }

    /// Write the snapshot atomically: serialize to a sibling temp file,
    /// then rename over the target.
    pub fn save(&self, snapshot: &FleetSnapshot) -> Result<(), CoreError> {
        let io_err = |source| CoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let serialized =
            serde_json::to_string_pretty(snapshot).map_err(|source| CoreError::Data {
                path: self.path.clone(),
                source,
            })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serialized).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;

        debug!(
            path = %self.path.display(),
            devices = snapshot.devices.len(),
            "fleet data saved"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{FirmwareDialect, NewDevice, PriorityGroup};
    use pretty_assertions::assert_eq;

    fn sample() -> FleetSnapshot {
        let device = NewDevice {
            name: "rack2-m30".into(),
            model: Some("Whatsminer M30S".into()),
            host: "10.0.2.14".into(),
            control_port: 4028,
            mgmt_port: 80,
            dialect: FirmwareDialect::Vnish,
            credentials: None,
            group: PriorityGroup::Medium,
        }
        .into_device();
        FleetSnapshot {
            devices: vec![device],
            control_log: Vec::new(),
            readings: Vec::new(),
        }
    }

    #[test]
    fn missing_file_loads_as_empty_fleet() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("fleet.json"));

        let snapshot = file.load().unwrap();
        assert!(snapshot.devices.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("nested").join("fleet.json"));

        file.save(&sample()).unwrap();
        let loaded = file.load().unwrap();

        assert_eq!(loaded.devices.len(), 1);
        assert_eq!(loaded.devices[0].name, "rack2-m30");
    }

    #[test]
    fn corrupt_file_is_a_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleet.json");
        fs::write(&path, "{ not json").unwrap();

        let err = SnapshotFile::new(path).load().unwrap_err();
        assert!(matches!(err, CoreError::Data { .. }));
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleet.json");
        SnapshotFile::new(&path).save(&sample()).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
