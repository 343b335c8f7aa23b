use crate::error::RoomPlanError;
use crate::spreadsheet::WorkbookFormat;
use chrono::DateTime;
use chrono::TimeZone;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;

/// Prefix format of archived file names
pub const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Directory keeping every uploaded workbook.
#[derive(Clone, Debug)]
pub struct UploadArchive {
    dir: PathBuf,
}

impl UploadArchive {
    pub fn new(dir: impl Into<PathBuf>) -> UploadArchive {
        UploadArchive { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes an upload as `<YYYYMMDD_HHMMSS>_<sanitized name>` and returns its path.
    pub fn store<Tz>(&self, original_name: &str, bytes: &[u8], now: DateTime<Tz>) -> Result<PathBuf, RoomPlanError>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        fs::create_dir_all(&self.dir)?;
        let file_name = format!(
            "{}_{}",
            now.format(ARCHIVE_TIMESTAMP_FORMAT),
            sanitize_file_name(original_name)
        );
        let path = self.dir.join(file_name);
        fs::write(&path, bytes)?;
        log::info!("Archived upload '{}' as {}", original_name, path.display());
        Ok(path)
    }

    /// Most recently modified `.xls`/`.xlsx` file, `None` when nothing was uploaded yet.
    pub fn latest(&self) -> Result<Option<PathBuf>, RoomPlanError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => Err(e)?,
        };
        let mut latest: Option<(SystemTime, PathBuf)> = None;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let is_workbook = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(WorkbookFormat::from_file_name)
                .is_some();
            if !is_workbook || !entry.file_type()?.is_file() {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            // Same mtime: the later timestamp prefix wins
            let newer = match &latest {
                Some((time, best)) => (modified, &path) > (*time, best),
                None => true,
            };
            if newer {
                latest = Some((modified, path));
            }
        }
        Ok(latest.map(|(_, path)| path))
    }
}

/// Keeps only the last path component and replaces every byte outside `[A-Za-z0-9_.-]` by `_`.
/// Non-ASCII characters therefore turn into one underscore per UTF-8 byte.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    base.bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b == b'-' {
                b as char
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use chrono::Utc;

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_file_name("rooms 2024.xlsx"), "rooms_2024.xlsx");
        assert_eq!(sanitize_file_name("План.xls"), "________.xls");
        assert_eq!(sanitize_file_name("../../etc/passwd.xls"), "passwd.xls");
        assert_eq!(sanitize_file_name(r"C:\Users\me\a-b_c.XLSX"), "a-b_c.XLSX");
    }

    #[test]
    fn stores_with_timestamp_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let archive = UploadArchive::new(dir.path().join("uploads"));
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let path = archive.store("План этажей.xlsx", b"PK", now).unwrap();

        // 21 UTF-8 bytes before the extension
        let expected = format!("20240506_070809_{}.xlsx", "_".repeat(21));
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), expected);
        assert_eq!(fs::read(&path).unwrap(), b"PK");
    }

    #[test]
    fn latest_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let archive = UploadArchive::new(dir.path());
        assert_eq!(UploadArchive::new(dir.path().join("missing")).latest().unwrap(), None);
        assert_eq!(archive.latest().unwrap(), None);

        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("folder.xlsx")).unwrap();
        assert_eq!(archive.latest().unwrap(), None);

        let first = archive.store("a.xls", b"1", Local::now()).unwrap();
        assert_eq!(archive.latest().unwrap(), Some(first));
    }
}
