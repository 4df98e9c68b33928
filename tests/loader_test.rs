use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use asset_inspection_dashboard::data::aggregate::{Dashboard, StatusLabels};
use asset_inspection_dashboard::data::cache::LoadCache;
use asset_inspection_dashboard::data::columns::{DUE_DATE, INSPECTION_DATE, STATUS};
use asset_inspection_dashboard::data::filter::FilteredView;
use asset_inspection_dashboard::data::loader::{load, DataSource, LoadError};
use asset_inspection_dashboard::data::model::CellValue;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use rusqlite::{params, Connection};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn days_since_epoch(d: NaiveDate) -> i32 {
    (d - date(1970, 1, 1)).num_days() as i32
}

fn write_sqlite(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE inspections (
             asset_type TEXT, site TEXT, status TEXT,
             inspection_date TEXT, due_date TEXT
         );",
    )
    .unwrap();
    let rows = [
        ("Pump", "North", "Passed", "2024-01-15", "2024-01-10"),
        ("Valve", "South", "Failed", "2024-01-20", "2024-02-01"),
        ("Pump", "South", "Passed", "2024-02-03", "2024-02-01"),
    ];
    for r in rows {
        conn.execute(
            "INSERT INTO inspections VALUES (?1, ?2, ?3, ?4, ?5)",
            params![r.0, r.1, r.2, r.3, r.4],
        )
        .unwrap();
    }
}

#[test]
fn sqlite_table_loads_with_typed_dates() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("inspections.db");
    write_sqlite(&db);

    let ds = load(&DataSource::Sqlite {
        db_path: db,
        table: "inspections".into(),
    })
    .unwrap();

    assert_eq!(ds.len(), 3);
    assert_eq!(ds.records[0].date(INSPECTION_DATE), Some(date(2024, 1, 15)));
    assert_eq!(ds.records[1].get(STATUS), &CellValue::from("Failed"));
    assert!(ds.fingerprint.starts_with("sqlite:"));

    let view = FilteredView::all(&ds);
    let dash = Dashboard::compute(&view, &StatusLabels::default());
    assert_eq!(dash.kpis.overdue, Ok(2));
    let months = dash.monthly_counts.unwrap();
    assert_eq!(months.len(), 2);
    assert_eq!(months[0].month_end, date(2024, 1, 31));
    assert_eq!(months[0].count, 2);
}

#[test]
fn sqlite_missing_table_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("inspections.db");
    write_sqlite(&db);

    let err = load(&DataSource::Sqlite {
        db_path: db,
        table: "audits".into(),
    })
    .unwrap_err();
    assert!(matches!(err, LoadError::TableNotFound(t) if t == "audits"));
}

#[test]
fn sqlite_table_name_ignores_case() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("inspections.db");
    write_sqlite(&db);

    let ds = load(&DataSource::Sqlite {
        db_path: db,
        table: "Inspections".into(),
    })
    .unwrap();
    assert_eq!(ds.len(), 3);
}

#[test]
fn sqlite_table_without_due_date_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("inspections.db");
    let conn = Connection::open(&db).unwrap();
    conn.execute_batch(
        "CREATE TABLE audits (status TEXT, inspection_date TEXT);
         INSERT INTO audits VALUES ('Passed', '2024-01-15');",
    )
    .unwrap();
    drop(conn);

    let err = load(&DataSource::Sqlite {
        db_path: db,
        table: "audits".into(),
    })
    .unwrap_err();
    assert!(matches!(err, LoadError::MissingDateColumn(col) if col == DUE_DATE));
}

#[test]
fn sqlite_missing_database_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load(&DataSource::Sqlite {
        db_path: dir.path().join("nope.db"),
        table: "inspections".into(),
    });
    assert!(result.is_err());
}

#[test]
fn parquet_date_and_timestamp_columns_load_as_dates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inspections.parquet");

    let inspected = [date(2024, 3, 1), date(2024, 3, 31)];
    // Timestamps at 23:00 UTC keep their calendar day.
    let due_ms: Vec<i64> = [date(2024, 2, 28), date(2024, 4, 15)]
        .iter()
        .map(|d| {
            d.and_hms_opt(23, 0, 0)
                .unwrap()
                .and_utc()
                .timestamp_millis()
        })
        .collect();

    let schema = Arc::new(Schema::new(vec![
        Field::new("status", DataType::Utf8, true),
        Field::new("inspection_date", DataType::Date32, true),
        Field::new(
            "due_date",
            DataType::Timestamp(TimeUnit::Millisecond, None),
            true,
        ),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec![Some("Passed"), None])),
        Arc::new(Date32Array::from_iter_values(
            inspected.iter().map(|d| days_since_epoch(*d)),
        )),
        Arc::new(TimestampMillisecondArray::from(due_ms)),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
    let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let ds = load(&DataSource::File(path)).unwrap();
    assert_eq!(ds.len(), 2);
    assert!(ds.fingerprint.starts_with("parquet:"));
    assert_eq!(ds.records[1].date(INSPECTION_DATE), Some(date(2024, 3, 31)));
    assert_eq!(ds.records[0].date(DUE_DATE), Some(date(2024, 2, 28)));
    assert!(ds.records[1].get(STATUS).is_null());

    let view = FilteredView::all(&ds);
    let dash = Dashboard::compute(&view, &StatusLabels::default());
    assert_eq!(dash.kpis.overdue, Ok(1));
    assert_eq!(dash.status_breakdown.unwrap()[&CellValue::Null], 1);
}

#[test]
fn load_cache_reuses_parsed_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inspections.json");
    let mut file = File::create(&path).unwrap();
    file.write_all(br#"[{"status": "Passed", "inspection_date": "2024-05-02", "due_date": null}]"#)
        .unwrap();
    drop(file);

    let mut cache = LoadCache::new(2);
    let source = DataSource::File(path);
    let first = cache.load(&source).unwrap();
    let second = cache.load(&source).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
}

#[test]
fn unsupported_extension_is_rejected_before_reading() {
    let err = load(&DataSource::File("inspections.xlsx".into())).unwrap_err();
    assert!(matches!(err, LoadError::UnsupportedFormat(_)));
}
