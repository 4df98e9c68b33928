use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;

use super::columns::Capabilities;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the inspection table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
/// Using `BTreeMap` / `BTreeSet` downstream so `CellValue` must be `Ord`.
#[derive(Debug, Clone)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Calendar date, no time-of-day and no timezone.
    Date(NaiveDate),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

/// Equality follows `Ord`, so a `Float(NaN)` equals itself.
impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) => s.hash(state),
            CellValue::Date(d) => d.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d)
    }
}

impl CellValue {
    /// The calendar date held by this cell, if it is a date.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Whether this cell is a string equal to `label`.
    pub fn is_label(&self, label: &str) -> bool {
        matches!(self, CellValue::String(s) if s == label)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

static NULL_CELL: CellValue = CellValue::Null;

// ---------------------------------------------------------------------------
// Record – one row of the table
// ---------------------------------------------------------------------------

/// A single inspection event (one row of the source table).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// Column name → value. Columns the row lacks read as `Null`.
    pub cells: BTreeMap<String, CellValue>,
}

impl Record {
    pub fn new(cells: BTreeMap<String, CellValue>) -> Self {
        Self { cells }
    }

    /// Value of `column`, `Null` when the row has no such cell.
    pub fn get(&self, column: &str) -> &CellValue {
        self.cells.get(column).unwrap_or(&NULL_CELL)
    }

    pub fn date(&self, column: &str) -> Option<NaiveDate> {
        self.get(column).as_date()
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed dataset with pre-computed column indices.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// All records (rows), in source order.
    pub records: Vec<Record>,
    /// Column names in source order.
    pub column_names: Vec<String>,
    /// For each column the sorted set of distinct values.
    pub unique_values: BTreeMap<String, BTreeSet<CellValue>>,
    /// Which well-known columns are present, resolved once at load time.
    pub capabilities: Capabilities,
    /// Identity of the source this dataset was loaded from.
    pub fingerprint: String,
}

impl Dataset {
    /// Build column indices from the loaded records.
    pub fn new(column_names: Vec<String>, records: Vec<Record>, fingerprint: String) -> Self {
        let mut unique_values: BTreeMap<String, BTreeSet<CellValue>> = column_names
            .iter()
            .map(|col| (col.clone(), BTreeSet::new()))
            .collect();

        for rec in &records {
            for col in &column_names {
                if let Some(vals) = unique_values.get_mut(col) {
                    vals.insert(rec.get(col).clone());
                }
            }
        }

        let capabilities = Capabilities::resolve(column_names.iter().map(String::as_str));

        Dataset {
            records,
            column_names,
            unique_values,
            capabilities,
            fingerprint,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.unique_values.contains_key(column)
    }

    /// Observed `(min, max)` of the dates in `column`, ignoring nulls.
    pub fn date_bounds(&self, column: &str) -> Option<(NaiveDate, NaiveDate)> {
        // BTreeSet is sorted and dates sort after every other variant.
        let mut dates = self
            .unique_values
            .get(column)?
            .iter()
            .filter_map(CellValue::as_date);
        let first = dates.next()?;
        let last = dates.last().unwrap_or(first);
        Some((first, last))
    }
}
