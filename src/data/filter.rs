use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use super::columns::INSPECTION_DATE;
use super::model::{CellValue, Dataset, Record};

// ---------------------------------------------------------------------------
// Filter selections
// ---------------------------------------------------------------------------

/// Inclusive calendar-date interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// A reversed interval contains nothing.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_reversed(&self) -> bool {
        self.start > self.end
    }
}

/// The active filter selections.
///
/// * `categorical`: column name → allowed values. A column absent from the
///   map is unconstrained; an empty set allows nothing.
/// * `date_range`: when set, only records whose `inspection_date` lies in
///   the interval pass. Null dates never pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterState {
    pub categorical: BTreeMap<String, BTreeSet<CellValue>>,
    pub date_range: Option<DateRange>,
}

impl FilterState {
    /// Initialise with everything selected: every optional categorical column
    /// allows all its values and the date range spans the observed dates.
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let caps = &dataset.capabilities;
        let categorical = caps
            .categorical_filters()
            .into_iter()
            .filter_map(|col| {
                dataset
                    .unique_values
                    .get(col)
                    .map(|vals| (col.to_string(), vals.clone()))
            })
            .collect();

        let date_range = if caps.date_filter() {
            dataset
                .date_bounds(INSPECTION_DATE)
                .map(|(start, end)| DateRange::new(start, end))
        } else {
            None
        };

        FilterState {
            categorical,
            date_range,
        }
    }

    /// Toggle a single value in a column's allow-list.
    pub fn toggle(&mut self, column: &str, value: &CellValue) {
        let selected = self.categorical.entry(column.to_string()).or_default();
        if !selected.remove(value) {
            selected.insert(value.clone());
        }
    }

    /// Select every distinct value of `column`.
    pub fn select_all(&mut self, dataset: &Dataset, column: &str) {
        if let Some(all_vals) = dataset.unique_values.get(column) {
            self.categorical.insert(column.to_string(), all_vals.clone());
        }
    }

    /// Deselect all values in a column.
    pub fn select_none(&mut self, column: &str) {
        self.categorical.insert(column.to_string(), BTreeSet::new());
    }

    /// Drop selections for columns or values the dataset does not have, so
    /// every allow-list stays a subset of the original distinct values.
    pub fn retain_known(&mut self, dataset: &Dataset) {
        self.categorical.retain(|col, selected| {
            match dataset.unique_values.get(col) {
                Some(all_vals) => {
                    selected.retain(|v| all_vals.contains(v));
                    true
                }
                None => false,
            }
        });
        if !dataset.capabilities.date_filter() {
            self.date_range = None;
        }
    }

    /// The independent predicates this state describes.
    pub fn predicates(&self) -> Vec<Predicate<'_>> {
        let mut preds: Vec<Predicate<'_>> = self
            .categorical
            .iter()
            .map(|(column, allowed)| Predicate::Membership {
                column: column.as_str(),
                allowed,
            })
            .collect();
        if let Some(range) = self.date_range {
            preds.push(Predicate::DateWithin {
                column: INSPECTION_DATE,
                range,
            });
        }
        preds
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// One filter condition over a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate<'a> {
    /// The record's value (missing → `Null`) is in `allowed`.
    Membership {
        column: &'a str,
        allowed: &'a BTreeSet<CellValue>,
    },
    /// The record's date lies in `range`, inclusive.
    DateWithin {
        column: &'static str,
        range: DateRange,
    },
}

impl Predicate<'_> {
    pub fn column(&self) -> &str {
        match self {
            Predicate::Membership { column, .. } => *column,
            Predicate::DateWithin { column, .. } => *column,
        }
    }

    pub fn test(&self, record: &Record) -> bool {
        match self {
            Predicate::Membership { column, allowed } => allowed.contains(record.get(column)),
            Predicate::DateWithin { column, range } => record
                .date(column)
                .is_some_and(|date| range.contains(date)),
        }
    }
}

// ---------------------------------------------------------------------------
// Filtered view
// ---------------------------------------------------------------------------

/// A read-only selection of rows of a [`Dataset`].
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    pub dataset: &'a Dataset,
    /// Indices into `dataset.records`, ascending.
    pub indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// Every row of the dataset.
    pub fn all(dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            indices: (0..dataset.len()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &'a Record> + '_ {
        let dataset = self.dataset;
        self.indices.iter().map(move |&i| &dataset.records[i])
    }

    /// Narrow the view further with a single predicate.
    pub fn retain(mut self, predicate: &Predicate<'_>) -> Self {
        // Predicates on absent columns are not applied.
        if !self.dataset.has_column(predicate.column()) {
            return self;
        }
        let dataset = self.dataset;
        self.indices.retain(|&i| predicate.test(&dataset.records[i]));
        self
    }

    /// Apply a whole filter state on top of this view.
    pub fn refine(self, filters: &FilterState) -> Self {
        filters
            .predicates()
            .iter()
            .fold(self, |view, pred| view.retain(pred))
    }
}

/// Apply `filters` to `dataset`, returning the rows that pass all of them.
pub fn apply<'a>(dataset: &'a Dataset, filters: &FilterState) -> FilteredView<'a> {
    FilteredView::all(dataset).refine(filters)
}

/// Return indices of records that pass all active filters.
pub fn filtered_indices(dataset: &Dataset, filters: &FilterState) -> Vec<usize> {
    apply(dataset, filters).indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::columns::{ASSET_TYPE, SITE};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Dataset {
        let rows = [
            ("Pump", "North", date(2024, 1, 5)),
            ("Valve", "North", date(2024, 1, 20)),
            ("Pump", "South", date(2024, 2, 3)),
            ("Tank", "South", date(2024, 3, 15)),
        ];
        let records = rows
            .iter()
            .map(|(asset, site, day)| {
                Record::new(BTreeMap::from([
                    (ASSET_TYPE.to_string(), CellValue::from(*asset)),
                    (SITE.to_string(), CellValue::from(*site)),
                    (INSPECTION_DATE.to_string(), CellValue::Date(*day)),
                ]))
            })
            .collect();
        Dataset::new(
            vec![ASSET_TYPE.into(), SITE.into(), INSPECTION_DATE.into()],
            records,
            "sample".into(),
        )
    }

    #[test]
    fn default_state_selects_everything() {
        let ds = sample();
        let filters = FilterState::from_dataset(&ds);
        assert_eq!(filters.categorical.len(), 2);
        assert_eq!(
            filters.date_range,
            Some(DateRange::new(date(2024, 1, 5), date(2024, 3, 15)))
        );
        assert_eq!(filtered_indices(&ds, &filters), vec![0, 1, 2, 3]);
    }

    #[test]
    fn categorical_and_date_filters_compose() {
        let ds = sample();
        let mut filters = FilterState::from_dataset(&ds);
        filters.toggle(ASSET_TYPE, &CellValue::from("Tank"));
        filters.date_range = Some(DateRange::new(date(2024, 1, 10), date(2024, 12, 31)));
        assert_eq!(filtered_indices(&ds, &filters), vec![1, 2]);
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let ds = sample();
        let mut filters = FilterState::default();
        filters.date_range = Some(DateRange::new(date(2024, 1, 20), date(2024, 2, 3)));
        assert_eq!(filtered_indices(&ds, &filters), vec![1, 2]);
    }

    #[test]
    fn empty_allow_list_yields_nothing() {
        let ds = sample();
        let mut filters = FilterState::from_dataset(&ds);
        filters.select_none(SITE);
        assert!(apply(&ds, &filters).is_empty());
    }

    #[test]
    fn reversed_range_yields_nothing() {
        let ds = sample();
        let mut filters = FilterState::from_dataset(&ds);
        let range = DateRange::new(date(2024, 3, 1), date(2024, 1, 1));
        assert!(range.is_reversed());
        filters.date_range = Some(range);
        assert!(apply(&ds, &filters).is_empty());
    }

    #[test]
    fn filters_on_absent_columns_are_skipped() {
        let ds = sample();
        let mut filters = FilterState::default();
        filters.select_none("inspector");
        assert_eq!(apply(&ds, &filters).len(), 4);
    }

    #[test]
    fn retain_known_drops_foreign_values() {
        let ds = sample();
        let mut filters = FilterState::from_dataset(&ds);
        filters.toggle(SITE, &CellValue::from("Atlantis"));
        filters.select_none("inspector");
        filters.retain_known(&ds);
        assert!(!filters.categorical[SITE].contains(&CellValue::from("Atlantis")));
        assert!(!filters.categorical.contains_key("inspector"));
    }

    #[test]
    fn toggle_round_trips() {
        let ds = sample();
        let original = FilterState::from_dataset(&ds);
        let mut filters = original.clone();
        let north = CellValue::from("North");
        filters.toggle(SITE, &north);
        assert!(!filters.categorical[SITE].contains(&north));
        filters.toggle(SITE, &north);
        assert_eq!(filters, original);
    }

    #[test]
    fn filtering_leaves_dataset_untouched() {
        let ds = sample();
        let before = ds.records.clone();
        let mut filters = FilterState::from_dataset(&ds);
        filters.select_none(ASSET_TYPE);
        let _ = apply(&ds, &filters);
        assert_eq!(ds.records, before);
    }
}
