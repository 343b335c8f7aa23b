mod common;

use chrono::Utc;
use pretty_assertions::assert_eq;
use room_plan::auth::Credentials;
use room_plan::auth::Session;
use room_plan::service::SNAPSHOT_WRITE_WARNING;
use room_plan::store::SnapshotStore;
use room_plan::Floor;
use room_plan::Service;
use room_plan::Settings;
use std::fs;

#[test]
fn upload_then_query() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::in_dir(dir.path());
    let service = Service::new(&settings);
    assert!(service.rooms().is_empty());

    let outcome = service
        .upload("Аренда март.xlsx", common::xlsx_workbook(&common::rent_report()))
        .unwrap();
    assert_eq!(outcome.warning, None);
    assert_eq!(outcome.rooms.len(), 4);
    assert!(outcome.archived_as.starts_with(&settings.uploads_dir));
    assert!(outcome.archived_as.to_string_lossy().ends_with(".xlsx"));

    // The snapshot is what later queries see
    assert_eq!(service.rooms(), outcome.rooms);
    assert_eq!(SnapshotStore::in_dir(&settings.data_dir).load(), outcome.rooms);
    let json: serde_json::Value = serde_json::from_str(&outcome.to_json().unwrap()).unwrap();
    assert_eq!(json.as_array().map(Vec::len), Some(4));

    let room = service.find("building-7-1", Floor::First, "12А").unwrap();
    assert_eq!(room.tenant.as_deref(), Some("ООО «Ромашка»"));
    // Latin look-alike letters match the Cyrillic suffix
    assert!(service.find("7-1", Floor::First, "12a").is_some());
    assert!(service.find("7-1", Floor::Second, "12а").is_none());
}

#[test]
fn later_upload_replaces_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let service = Service::new(&Settings::in_dir(dir.path()));
    service.upload("first.xls", common::xls_workbook(&common::rent_report())).unwrap();

    let rows = vec![
        vec![],
        vec![],
        vec![],
        vec!["Объект недвижимости", "Контрагент"],
        vec!["№ 99", "ООО Новый"],
    ];
    let outcome = service.upload("second.xlsx", common::xlsx_workbook(&rows)).unwrap();
    assert_eq!(outcome.rooms.len(), 1);
    assert_eq!(service.rooms(), outcome.rooms);
    assert_eq!(service.rooms()[0].number, "99");
}

#[test]
fn snapshot_failure_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::in_dir(dir.path());
    // A file where the data directory should be
    fs::write(&settings.data_dir, "").unwrap();

    let outcome = Service::new(&settings)
        .upload("report.xlsx", common::xlsx_workbook(&common::rent_report()))
        .unwrap();
    assert_eq!(outcome.warning.as_deref(), Some(SNAPSHOT_WRITE_WARNING));
    assert_eq!(outcome.rooms.len(), 4);

    let json: serde_json::Value = serde_json::from_str(&outcome.to_json().unwrap()).unwrap();
    assert_eq!(json["warning"], "Cannot write rooms.json (permissions)");
    assert_eq!(json["data"].as_array().map(Vec::len), Some(4));
}

#[test]
fn table_shows_latest_upload() {
    let dir = tempfile::tempdir().unwrap();
    let service = Service::new(&Settings::in_dir(dir.path()));
    service.upload("report.xls", common::xls_workbook(&common::rent_report())).unwrap();

    let html = service.table_html().unwrap();
    assert!(html.contains("<div class=\"note\">Источник: "));
    assert!(html.contains("_report.xls (обновлено: "));
    assert!(html.contains("<table class=\"excel\">"));
    assert!(html.contains("<td>ООО «Ромашка»</td>"));
    assert!(html.contains("<td align=\"right\">10000</td>"));
    assert_eq!(html.matches("<tr>").count(), 12);
}

#[test]
fn remember_me_round_trip() {
    let settings = Settings {
        credentials: Credentials::new("admin", Some("s3cret".to_owned())),
        remember_me_secret: "integration-secret".to_owned(),
        ..Settings::default()
    };

    let mut session = Session::default();
    assert!(session.login(&settings.credentials, "admin", "wrong").is_err());
    session.login(&settings.credentials, "admin", "s3cret").unwrap();
    let token = settings.remember_me().issue(session.username().unwrap(), Utc::now()).unwrap();

    // A fresh session, as on the next visit
    let mut next = Session::default();
    assert!(next.restore(&settings.remember_me(), Some(&token), Utc::now()));
    assert_eq!(next.require().unwrap(), "admin");
}
