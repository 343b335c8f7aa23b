//! On-disk state: the rooms snapshot and the archive of uploaded workbooks.
pub mod snapshot;
pub mod uploads;

pub use snapshot::SnapshotStore;
pub use uploads::UploadArchive;
