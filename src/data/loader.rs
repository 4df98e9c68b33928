use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type,
    Int8Type, TimeUnit, TimestampMicrosecondType, TimestampMillisecondType,
    TimestampNanosecondType, TimestampSecondType, UInt16Type, UInt32Type, UInt8Type,
};
use arrow::util::display::array_value_to_string;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::cache::SourceKey;
use super::columns::DATE_COLUMNS;
use super::model::{CellValue, Dataset, Record};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a dataset could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("parsing JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("reading parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("reading arrow data: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("querying SQLite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),
    #[error("table '{0}' does not exist")]
    TableNotFound(String),
    #[error("required date column '{0}' is missing")]
    MissingDateColumn(&'static str),
    #[error("row {row}: '{value}' in column '{column}' is not a date")]
    InvalidDate {
        column: String,
        row: usize,
        value: String,
    },
    #[error("{0}")]
    Malformed(String),
}

impl LoadError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn invalid_date(column: &str, row: usize, value: impl Into<String>) -> Self {
        LoadError::InvalidDate {
            column: column.to_string(),
            row,
            value: value.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Tabular file formats accepted as an uploaded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Csv,
    Json,
    Parquet,
}

impl FileFormat {
    /// Dispatch by extension.
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "json" => Ok(FileFormat::Json),
            "parquet" | "pq" => Ok(FileFormat::Parquet),
            other => Err(LoadError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Json => "json",
            FileFormat::Parquet => "parquet",
        }
    }
}

/// Where a dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// A CSV, JSON or Parquet file picked by the operator.
    File(PathBuf),
    /// A table in a SQLite database.
    Sqlite { db_path: PathBuf, table: String },
}

impl DataSource {
    /// Short label for status messages.
    pub fn describe(&self) -> String {
        match self {
            DataSource::File(path) => path.display().to_string(),
            DataSource::Sqlite { db_path, table } => format!("{}::{table}", db_path.display()),
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a dataset from any source, bypassing the cache.
pub fn load(source: &DataSource) -> Result<Dataset, LoadError> {
    match source {
        DataSource::File(path) => load_file(path),
        DataSource::Sqlite { db_path, table } => load_sqlite(db_path, table),
    }
}

/// Load a file, choosing the parser by extension.
pub fn load_file(path: &Path) -> Result<Dataset, LoadError> {
    let format = FileFormat::from_path(path)?;
    let bytes = std::fs::read(path).map_err(|e| LoadError::io(path, e))?;
    load_bytes(format, bytes)
}

/// Parse an in-memory payload. The dataset fingerprint is a hash of the bytes.
pub fn load_bytes(format: FileFormat, bytes: Vec<u8>) -> Result<Dataset, LoadError> {
    let fingerprint = SourceKey::from_bytes(format, &bytes).into_string();
    match format {
        FileFormat::Csv => parse_csv(&bytes, fingerprint),
        FileFormat::Json => parse_json(&bytes, fingerprint),
        FileFormat::Parquet => parse_parquet(Bytes::from(bytes), fingerprint),
    }
}

// ---------------------------------------------------------------------------
// Cell parsing
// ---------------------------------------------------------------------------

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Parse a textual date or date-time into its calendar date.
///
/// Date-times keep the date as written; an offset does not shift the day.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Some(d) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    {
        return Some(d);
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.date());
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.naive_local().date())
}

fn is_date_column(column: &str) -> bool {
    DATE_COLUMNS.contains(&column)
}

/// Every source must carry both date columns.
fn require_date_columns(columns: &[String]) -> Result<(), LoadError> {
    match DATE_COLUMNS
        .iter()
        .find(|required| !columns.iter().any(|c| c == *required))
    {
        Some(missing) => Err(LoadError::MissingDateColumn(*missing)),
        None => Ok(()),
    }
}

fn text_to_date(column: &str, raw: &str, row: usize) -> Result<CellValue, LoadError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(CellValue::Null);
    }
    parse_date(trimmed)
        .map(CellValue::Date)
        .ok_or_else(|| LoadError::invalid_date(column, row, trimmed))
}

fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Some(f) = s.parse::<f64>().ok().filter(|f| f.is_finite()) {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one inspection per row.
fn parse_csv(bytes: &[u8], fingerprint: String) -> Result<Dataset, LoadError> {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    require_date_columns(&headers)?;

    let mut records = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let row = result?;
        let mut cells = BTreeMap::new();
        for (column, raw) in headers.iter().zip(row.iter()) {
            let value = if is_date_column(column) {
                text_to_date(column, raw, row_no)?
            } else {
                guess_cell_type(raw)
            };
            cells.insert(column.clone(), value);
        }
        records.push(Record::new(cells));
    }

    Ok(Dataset::new(headers, records, fingerprint))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "asset_type": "Pump", "status": "Passed", "inspection_date": "2024-01-15" },
///   ...
/// ]
/// ```
fn parse_json(bytes: &[u8], fingerprint: String) -> Result<Dataset, LoadError> {
    let root: JsonValue = serde_json::from_slice(bytes)?;
    let rows = root
        .as_array()
        .ok_or_else(|| LoadError::Malformed("expected a top-level JSON array".into()))?;

    let mut column_names: Vec<String> = Vec::new();
    let mut records = Vec::with_capacity(rows.len());

    for (row_no, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .ok_or_else(|| LoadError::Malformed(format!("row {row_no} is not a JSON object")))?;

        let mut cells = BTreeMap::new();
        for (key, val) in obj {
            if !column_names.contains(key) {
                column_names.push(key.clone());
            }
            let value = if is_date_column(key) {
                json_to_date(key, val, row_no)?
            } else {
                json_to_cell(val)
            };
            cells.insert(key.clone(), value);
        }
        records.push(Record::new(cells));
    }
    require_date_columns(&column_names)?;

    Ok(Dataset::new(column_names, records, fingerprint))
}

fn json_to_date(column: &str, val: &JsonValue, row: usize) -> Result<CellValue, LoadError> {
    match val {
        JsonValue::Null => Ok(CellValue::Null),
        JsonValue::String(s) => text_to_date(column, s, row),
        other => Err(LoadError::invalid_date(column, row, other.to_string())),
    }
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet payload written by Pandas (`df.to_parquet()`), Polars or
/// Arrow. Date columns may be `Date32`, `Date64`, any `Timestamp` or text.
fn parse_parquet(bytes: Bytes, fingerprint: String) -> Result<Dataset, LoadError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes)?;
    let column_names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    require_date_columns(&column_names)?;
    let reader = builder.build()?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;
        let offset = records.len();

        for row in 0..batch.num_rows() {
            let mut cells = BTreeMap::new();
            for (col_idx, column) in column_names.iter().enumerate() {
                let array = batch.column(col_idx);
                let value = if is_date_column(column) {
                    extract_date(array, column, row, offset + row)?
                } else {
                    extract_cell(array, row)?
                };
                cells.insert(column.clone(), value);
            }
            records.push(Record::new(cells));
        }
    }

    Ok(Dataset::new(column_names, records, fingerprint))
}

// -- Arrow helpers --

/// Extract a calendar date from an Arrow column at the given row.
/// Timestamps are read as their UTC calendar date.
fn extract_date(
    col: &ArrayRef,
    column: &str,
    row: usize,
    row_no: usize,
) -> Result<CellValue, LoadError> {
    if col.is_null(row) {
        return Ok(CellValue::Null);
    }
    let date = match col.data_type() {
        DataType::Date32 => col.as_primitive::<Date32Type>().value_as_date(row),
        DataType::Date64 => col.as_primitive::<Date64Type>().value_as_date(row),
        DataType::Timestamp(TimeUnit::Second, _) => {
            col.as_primitive::<TimestampSecondType>().value_as_date(row)
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            col.as_primitive::<TimestampMillisecondType>().value_as_date(row)
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            col.as_primitive::<TimestampMicrosecondType>().value_as_date(row)
        }
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            col.as_primitive::<TimestampNanosecondType>().value_as_date(row)
        }
        DataType::Utf8 => return text_to_date(column, col.as_string::<i32>().value(row), row_no),
        DataType::LargeUtf8 => {
            return text_to_date(column, col.as_string::<i64>().value(row), row_no)
        }
        other => return Err(LoadError::invalid_date(column, row_no, format!("{other:?}"))),
    };
    date.map(CellValue::Date)
        .ok_or_else(|| LoadError::invalid_date(column, row_no, array_value_to_string(col, row).unwrap_or_default()))
}

/// Extract a single value from an Arrow column at a given row.
fn extract_cell(col: &ArrayRef, row: usize) -> Result<CellValue, LoadError> {
    if col.is_null(row) {
        return Ok(CellValue::Null);
    }
    let value = match col.data_type() {
        DataType::Utf8 => CellValue::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => CellValue::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int8 => CellValue::Integer(col.as_primitive::<Int8Type>().value(row).into()),
        DataType::Int16 => CellValue::Integer(col.as_primitive::<Int16Type>().value(row).into()),
        DataType::Int32 => CellValue::Integer(col.as_primitive::<Int32Type>().value(row).into()),
        DataType::Int64 => CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => CellValue::Integer(col.as_primitive::<UInt8Type>().value(row).into()),
        DataType::UInt16 => CellValue::Integer(col.as_primitive::<UInt16Type>().value(row).into()),
        DataType::UInt32 => CellValue::Integer(col.as_primitive::<UInt32Type>().value(row).into()),
        DataType::Float32 => CellValue::Float(col.as_primitive::<Float32Type>().value(row).into()),
        DataType::Float64 => CellValue::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => CellValue::Bool(col.as_boolean().value(row)),
        DataType::Date32 => col
            .as_primitive::<Date32Type>()
            .value_as_date(row)
            .map_or(CellValue::Null, CellValue::Date),
        _ => CellValue::String(array_value_to_string(col, row)?),
    };
    Ok(value)
}

// ---------------------------------------------------------------------------
// SQLite loader
// ---------------------------------------------------------------------------

/// Read every row of `table` from the SQLite database at `db_path`.
///
/// The database is opened read-only and the table must exist. Table names
/// match case-insensitively, as SQLite identifiers do, and are quoted.
pub fn load_sqlite(db_path: &Path, table: &str) -> Result<Dataset, LoadError> {
    let fingerprint = SourceKey::from_sqlite(db_path, table)?.into_string();
    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master \
         WHERE type IN ('table', 'view') AND name = ?1 COLLATE NOCASE)",
        [table],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(LoadError::TableNotFound(table.to_string()));
    }

    let sql = format!("SELECT * FROM \"{}\"", table.replace('"', "\"\""));
    let mut stmt = conn.prepare(&sql)?;
    let column_names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();
    require_date_columns(&column_names)?;

    let mut rows = stmt.query([])?;
    let mut records = Vec::new();

    while let Some(row) = rows.next()? {
        let row_no = records.len();
        let mut cells = BTreeMap::new();
        for (idx, column) in column_names.iter().enumerate() {
            let value = sql_to_cell(column, row.get_ref(idx)?, row_no)?;
            cells.insert(column.clone(), value);
        }
        records.push(Record::new(cells));
    }

    Ok(Dataset::new(column_names, records, fingerprint))
}

fn sql_to_cell(column: &str, value: ValueRef<'_>, row: usize) -> Result<CellValue, LoadError> {
    let text = match value {
        ValueRef::Null => return Ok(CellValue::Null),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes),
        ValueRef::Integer(i) if !is_date_column(column) => return Ok(CellValue::Integer(i)),
        ValueRef::Real(f) if !is_date_column(column) => return Ok(CellValue::Float(f)),
        ValueRef::Blob(b) if !is_date_column(column) => {
            return Ok(CellValue::String(format!("<{} bytes>", b.len())))
        }
        other => {
            return Err(LoadError::invalid_date(
                column,
                row,
                format!("{:?}", other.data_type()),
            ))
        }
    };
    if is_date_column(column) {
        text_to_date(column, &text, row)
    } else {
        Ok(CellValue::String(text.into_owned()))
    }
}
