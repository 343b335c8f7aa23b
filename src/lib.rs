//! # Room Plan
//!
//! Back end of an interactive floor plan. Facility staff upload the monthly rent report, an Excel
//! workbook kept by hand, and the floor plan colours each room by whether it is rented.
//!
//! ## Features
//!
//! - **Workbook decoding**: reads the first worksheet of `.xls` (BIFF8) and `.xlsx` (SpreadsheetML)
//!   files into a plain text grid, without any Excel or LibreOffice installation
//! - **Room extraction**: finds the header row, matches columns by their titles, tracks floor
//!   banners and reads room and building numbers out of free-text labels
//! - **Snapshot**: the rooms of the last upload are kept as `rooms.json` for the floor plan
//! - **Upload archive**: every uploaded workbook is kept under a timestamped name and the newest
//!   one can be rendered as an HTML table
//! - **Sign-in**: one configured account and HMAC-signed remember-me tokens valid for 30 days
//!
//! ## Command line
//!
//! The `room-plan` binary exposes `login`, `upload`, `rooms`, `find` and `table`; see
//! [`cli::Args`].
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
mod helpers;
pub mod rooms;
pub mod service;
pub mod spreadsheet;
pub mod store;

pub use config::Settings;
pub use error::RoomPlanError;
pub use rooms::Floor;
pub use rooms::RoomRecord;
pub use service::Service;
pub use service::UploadOutcome;
