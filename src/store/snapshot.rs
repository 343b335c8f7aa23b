use crate::error::RoomPlanError;
use crate::rooms::RoomRecord;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

/// File name of the snapshot inside the data directory
pub const SNAPSHOT_FILE_NAME: &str = "rooms.json";

/// The JSON document holding the rooms of the last successful upload.
#[derive(Clone, Debug)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> SnapshotStore {
        SnapshotStore { path: path.into() }
    }

    /// Snapshot stored as [`SNAPSHOT_FILE_NAME`] in `data_dir`
    pub fn in_dir(data_dir: &Path) -> SnapshotStore {
        SnapshotStore::new(data_dir.join(SNAPSHOT_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the snapshot back. A missing, unreadable or malformed snapshot reads as no rooms.
    pub fn load(&self) -> Vec<RoomRecord> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                log::warn!("Cannot read snapshot {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(rooms) => rooms,
            Err(e) => {
                log::warn!("Ignoring malformed snapshot {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// Replaces the snapshot. The document is written next to the target and renamed over it,
    /// so readers see either the old or the new snapshot.
    pub fn save(&self, rooms: &[RoomRecord]) -> Result<(), RoomPlanError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut temporary = self.path.clone().into_os_string();
        temporary.push(".tmp");
        let temporary = PathBuf::from(temporary);

        fs::write(&temporary, serde_json::to_vec(rooms)?)?;
        if let Err(e) = fs::rename(&temporary, &self.path) {
            let _ = fs::remove_file(&temporary);
            return Err(e.into());
        }
        log::debug!("Saved {} rooms to {}", rooms.len(), self.path.display());
        Ok(())
    }
}
