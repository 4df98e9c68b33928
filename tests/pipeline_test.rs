use std::collections::{BTreeMap, BTreeSet};

use asset_inspection_dashboard::data::aggregate::{
    fail_rate, monthly_counts, pass_rate, status_breakdown, total_count, Dashboard, StatusLabels,
};
use asset_inspection_dashboard::data::columns::{
    ASSET_TYPE, DUE_DATE, INSPECTION_DATE, SITE, STATUS,
};
use asset_inspection_dashboard::data::filter::{apply, DateRange, FilterState, FilteredView};
use asset_inspection_dashboard::data::model::{CellValue, Dataset, Record};
use chrono::{Days, NaiveDate};
use proptest::prelude::*;

const ASSETS: [&str; 3] = ["Pump", "Valve", "Tank"];
const SITES: [&str; 2] = ["North", "South"];

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 11, 1).unwrap()
}

fn day(offset: u64) -> NaiveDate {
    base_date().checked_add_days(Days::new(offset)).unwrap()
}

#[derive(Debug, Clone)]
struct Row {
    asset: Option<usize>,
    site: usize,
    status: &'static str,
    inspected: u64,
    due: u64,
}

fn row_strategy(statuses: &'static [&'static str]) -> impl Strategy<Value = Row> {
    (
        prop::option::weighted(0.9, 0..ASSETS.len()),
        0..SITES.len(),
        prop::sample::select(statuses),
        0u64..200,
        0u64..200,
    )
        .prop_map(|(asset, site, status, inspected, due)| Row {
            asset,
            site,
            status,
            inspected,
            due,
        })
}

fn build(rows: &[Row]) -> Dataset {
    let records = rows
        .iter()
        .map(|r| {
            let mut cells = BTreeMap::from([
                (SITE.to_string(), CellValue::from(SITES[r.site])),
                (STATUS.to_string(), CellValue::from(r.status)),
                (INSPECTION_DATE.to_string(), CellValue::Date(day(r.inspected))),
                (DUE_DATE.to_string(), CellValue::Date(day(r.due))),
            ]);
            if let Some(a) = r.asset {
                cells.insert(ASSET_TYPE.to_string(), CellValue::from(ASSETS[a]));
            }
            Record::new(cells)
        })
        .collect();
    Dataset::new(
        vec![
            ASSET_TYPE.into(),
            SITE.into(),
            STATUS.into(),
            INSPECTION_DATE.into(),
            DUE_DATE.into(),
        ],
        records,
        "proptest".into(),
    )
}

/// A filter state whose allow-lists are random subsets of the dataset's values.
fn random_filters(ds: &Dataset, keep_mask: u8, range: Option<(u64, u64)>) -> FilterState {
    let mut filters = FilterState::from_dataset(ds);
    let mut bit = 0;
    for selected in filters.categorical.values_mut() {
        let values: Vec<CellValue> = selected.iter().cloned().collect();
        for v in values {
            if keep_mask & (1 << (bit % 8)) == 0 {
                selected.remove(&v);
            }
            bit += 1;
        }
    }
    if let Some((a, b)) = range {
        filters.date_range = Some(DateRange::new(day(a), day(b)));
    }
    filters
}

const MIXED: &[&str] = &["Passed", "Failed", "Pending"];
const BINARY: &[&str] = &["Passed", "Failed"];

proptest! {
    #[test]
    fn filtering_is_a_subset_and_idempotent(
        rows in prop::collection::vec(row_strategy(MIXED), 0..40),
        mask in any::<u8>(),
        range in prop::option::of((0u64..200, 0u64..200)),
    ) {
        let ds = build(&rows);
        let filters = random_filters(&ds, mask, range);

        let once = apply(&ds, &filters);
        prop_assert!(once.len() <= ds.len());
        prop_assert!(once.indices.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(once.indices.iter().all(|&i| i < ds.len()));

        let twice = once.clone().refine(&filters);
        prop_assert_eq!(twice.indices, once.indices);
    }

    #[test]
    fn predicates_commute(
        rows in prop::collection::vec(row_strategy(MIXED), 0..40),
        mask in any::<u8>(),
        range in prop::option::of((0u64..200, 0u64..200)),
        rotation in 0usize..4,
    ) {
        let ds = build(&rows);
        let filters = random_filters(&ds, mask, range);
        let preds = filters.predicates();

        let forward = preds
            .iter()
            .fold(FilteredView::all(&ds), |view, p| view.retain(p));
        let backward = preds
            .iter()
            .rev()
            .fold(FilteredView::all(&ds), |view, p| view.retain(p));
        let mut rotated_order = preds.clone();
        if !rotated_order.is_empty() {
            let k = rotation % rotated_order.len();
            rotated_order.rotate_left(k);
        }
        let rotated = rotated_order
            .iter()
            .fold(FilteredView::all(&ds), |view, p| view.retain(p));

        prop_assert_eq!(&forward.indices, &backward.indices);
        prop_assert_eq!(&forward.indices, &rotated.indices);
        prop_assert_eq!(&forward.indices, &apply(&ds, &filters).indices);
    }

    #[test]
    fn rates_never_exceed_hundred(
        rows in prop::collection::vec(row_strategy(MIXED), 1..40),
    ) {
        let ds = build(&rows);
        let view = FilteredView::all(&ds);
        let labels = StatusLabels::default();
        let pass = pass_rate(&view, &labels).unwrap().unwrap();
        let fail = fail_rate(&view, &labels).unwrap().unwrap();
        prop_assert!((0.0..=100.0).contains(&pass));
        prop_assert!((0.0..=100.0).contains(&fail));
        prop_assert!(pass + fail <= 100.0 + 1e-9);
    }

    #[test]
    fn rates_sum_to_hundred_on_exact_partition(
        rows in prop::collection::vec(row_strategy(BINARY), 1..40),
    ) {
        let ds = build(&rows);
        let view = FilteredView::all(&ds);
        let labels = StatusLabels::default();
        let pass = pass_rate(&view, &labels).unwrap().unwrap();
        let fail = fail_rate(&view, &labels).unwrap().unwrap();
        prop_assert!((pass + fail - 100.0).abs() < 1e-9);
    }

    #[test]
    fn breakdown_and_months_sum_to_total(
        rows in prop::collection::vec(row_strategy(MIXED), 0..40),
        mask in any::<u8>(),
        range in prop::option::of((0u64..200, 0u64..200)),
    ) {
        let ds = build(&rows);
        let filters = random_filters(&ds, mask, range);
        let view = apply(&ds, &filters);
        let total = total_count(&view);

        let breakdown = status_breakdown(&view).unwrap();
        prop_assert_eq!(breakdown.values().sum::<usize>(), total);

        let months = monthly_counts(&view).unwrap();
        prop_assert_eq!(months.iter().map(|m| m.count).sum::<usize>(), total);
        prop_assert!(months.windows(2).all(|w| w[0].month_end < w[1].month_end));
        prop_assert!(months.iter().all(|m| m.count > 0));
    }

    #[test]
    fn empty_allow_list_empties_the_view(
        rows in prop::collection::vec(row_strategy(MIXED), 0..40),
        pick_site in any::<bool>(),
    ) {
        let ds = build(&rows);
        let mut filters = FilterState::from_dataset(&ds);
        filters.select_none(if pick_site { SITE } else { ASSET_TYPE });
        let view = apply(&ds, &filters);
        prop_assert_eq!(total_count(&view), 0);

        let dash = Dashboard::compute(&view, &StatusLabels::default());
        prop_assert_eq!(dash.kpis.pass_rate, Ok(None));
        prop_assert_eq!(dash.kpis.fail_rate, Ok(None));
        prop_assert_eq!(dash.kpis.overdue, Ok(0));
    }

    #[test]
    fn default_filters_keep_every_dated_record(
        rows in prop::collection::vec(row_strategy(MIXED), 0..40),
    ) {
        let ds = build(&rows);
        let filters = FilterState::from_dataset(&ds);
        prop_assert_eq!(apply(&ds, &filters).len(), ds.len());

        // Allow-lists stay within the observed values.
        for (col, selected) in &filters.categorical {
            let observed: &BTreeSet<CellValue> = &ds.unique_values[col];
            prop_assert!(selected.is_subset(observed));
        }
    }
}

#[test]
fn five_record_scenario() {
    let rows: Vec<Row> = ["Passed", "Passed", "Failed", "Passed", "Failed"]
        .into_iter()
        .map(|status| Row {
            asset: Some(0),
            site: 0,
            status,
            inspected: 10,
            due: 12,
        })
        .collect();
    let ds = build(&rows);
    let view = FilteredView::all(&ds);
    let dash = Dashboard::compute(&view, &StatusLabels::default());
    assert_eq!(dash.kpis.total, 5);
    assert_eq!(dash.kpis.pass_rate, Ok(Some(60.0)));
    assert_eq!(dash.kpis.fail_rate, Ok(Some(40.0)));
    assert_eq!(dash.kpis.overdue, Ok(0));
}
