//! # Room Plan Service
//!
//! The operations behind the floor-plan front end: accept a workbook upload, answer room queries
//! from the last snapshot, and render the last uploaded workbook as an HTML table.
//!
//! Every operation is synchronous and works on the directories named in [`Settings`]. Callers are
//! expected to check the session before calling in.
use crate::config::Settings;
use crate::error::ErrorContext;
use crate::error::RoomPlanError;
use crate::rooms;
use crate::rooms::Floor;
use crate::rooms::RoomRecord;
use crate::spreadsheet;
use crate::spreadsheet::html::escape_html;
use crate::spreadsheet::html::render_table;
use crate::spreadsheet::WorkbookFormat;
use crate::store::SnapshotStore;
use crate::store::UploadArchive;
use chrono::DateTime;
use chrono::Local;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

/// Warning attached to an upload whose rooms could not be persisted
pub const SNAPSHOT_WRITE_WARNING: &str = "Cannot write rooms.json (permissions)";

const TABLE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const PAGE_HEAD: &str = r#"<!doctype html>
<html lang="ru">
<head>
<meta charset="utf-8" />
<meta name="viewport" content="width=device-width, initial-scale=1" />
<title>Таблица данных</title>
<style>
body { margin: 0; font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; background: #f5f7fa; }
.wrap { padding: 20px; max-width: 1400px; margin: 0 auto; }
.note { color: #2c3e50; margin: 15px 0; background: #fff; padding: 15px; border-left: 4px solid #3498db; font-size: 14px; }
.table-scroll { background: #fff; overflow-x: auto; }
table.excel { border-collapse: collapse; width: 100%; font-size: 13px; }
table.excel td { padding: 12px; border-bottom: 1px solid #ecf0f1; vertical-align: top; }
table.excel tr:nth-child(even) { background-color: #f8f9fa; }
table.excel td[align="right"] { font-weight: 600; color: #27ae60; }
</style>
</head>
<body>
<div class="wrap">
"#;

const PAGE_TAIL: &str = "</div>\n</body>\n</html>\n";

/// Errors that reject an upload
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("No file uploaded")]
    NoFile,

    #[error("Unsupported file type")]
    UnsupportedFileType(String),

    #[error("Failed to move uploaded file (permissions?)")]
    ArchiveFailed(#[source] Box<RoomPlanError>),
}

/// Result of a successful upload.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadOutcome {
    pub rooms: Vec<RoomRecord>,
    /// Where the workbook was archived
    pub archived_as: PathBuf,
    /// Set when the rooms were extracted but the snapshot could not be written
    pub warning: Option<String>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum UploadResponse<'a> {
    Rooms(&'a [RoomRecord]),
    Warning { warning: &'a str, data: &'a [RoomRecord] },
}

impl UploadOutcome {
    /// Response body: the room array, or `{"warning": ..., "data": [...]}`.
    pub fn to_json(&self) -> Result<String, RoomPlanError> {
        let response = match &self.warning {
            Some(warning) => UploadResponse::Warning { warning, data: &self.rooms },
            None => UploadResponse::Rooms(&self.rooms),
        };
        Ok(serde_json::to_string(&response)?)
    }
}

pub struct Service {
    snapshot: SnapshotStore,
    archive: UploadArchive,
}

impl Service {
    pub fn new(settings: &Settings) -> Service {
        Service {
            snapshot: SnapshotStore::in_dir(&settings.data_dir),
            archive: UploadArchive::new(&settings.uploads_dir),
        }
    }

    /// Archives an uploaded workbook, extracts its rooms and replaces the snapshot.
    pub fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadOutcome, RoomPlanError> {
        if file_name.trim().is_empty() {
            Err(UploadError::NoFile)?;
        }
        if WorkbookFormat::from_file_name(file_name).is_none() {
            log::info!("Rejected upload '{}': unsupported file type", file_name);
            Err(UploadError::UnsupportedFileType(file_name.to_owned()))?;
        }

        let archived_as = self
            .archive
            .store(file_name, &bytes, Local::now())
            .map_err(|e| {
                log::error!("Cannot archive upload '{}': {}", file_name, e);
                UploadError::ArchiveFailed(Box::new(e))
            })?;

        let grid = spreadsheet::read_grid_from_bytes(file_name, bytes).context("Parse error")?;
        let rooms = rooms::extract(&grid);
        log::info!("Extracted {} rooms from '{}'", rooms.len(), file_name);

        let warning = match self.snapshot.save(&rooms) {
            Ok(()) => None,
            Err(e) => {
                log::warn!("Cannot write snapshot {}: {}", self.snapshot.path().display(), e);
                Some(SNAPSHOT_WRITE_WARNING.to_owned())
            }
        };
        Ok(UploadOutcome { rooms, archived_as, warning })
    }

    /// Rooms of the last successful upload
    pub fn rooms(&self) -> Vec<RoomRecord> {
        self.snapshot.load()
    }

    pub fn find(&self, building: &str, floor: Floor, number: &str) -> Option<RoomRecord> {
        rooms::find_room(&self.rooms(), building, floor, number).cloned()
    }

    /// HTML page showing the first sheet of the most recently uploaded workbook.
    pub fn table_html(&self) -> Result<String, RoomPlanError> {
        let mut page = String::from(PAGE_HEAD);
        match self.archive.latest()? {
            None => page.push_str(
                "<div class=\"note\">Файл Excel ещё не загружен. Загрузите .xls или .xlsx выше, чтобы увидеть таблицу.</div>\n",
            ),
            Some(path) => render_source(&mut page, &path)?,
        }
        page.push_str(PAGE_TAIL);
        Ok(page)
    }
}

fn render_source(page: &mut String, path: &Path) -> Result<(), RoomPlanError> {
    let name = path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
    let modified: DateTime<Local> = fs::metadata(path)?.modified()?.into();
    page.push_str(&format!(
        "<div class=\"note\">Источник: {} (обновлено: {})</div>\n",
        escape_html(&name),
        modified.format(TABLE_TIMESTAMP_FORMAT)
    ));

    page.push_str("<div class=\"table-scroll\">\n");
    match spreadsheet::read_grid(path) {
        Ok(grid) => {
            page.push_str(&render_table(&grid));
            page.push('\n');
        }
        Err(e) => {
            log::warn!("Cannot render {}: {}", path.display(), e);
            let format = WorkbookFormat::from_file_name(&name).map(|format| format.extension()).unwrap_or("");
            page.push_str(&format!(
                "<div class=\"note\">Ошибка чтения {}: {}</div>\n",
                format.to_uppercase(),
                escape_html(&e.to_string())
            ));
        }
    }
    page.push_str("</div>\n");
    Ok(())
}
