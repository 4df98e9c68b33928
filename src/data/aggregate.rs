use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use serde::Deserialize;

use super::columns::{SchemaError, ASSET_TYPE, DUE_DATE, INSPECTION_DATE, STATUS};
use super::filter::FilteredView;
use super::model::CellValue;

// ---------------------------------------------------------------------------
// Status labels
// ---------------------------------------------------------------------------

/// The `status` values counted as a pass or a fail.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatusLabels {
    pub passed: String,
    pub failed: String,
}

impl Default for StatusLabels {
    fn default() -> Self {
        Self {
            passed: "Passed".to_string(),
            failed: "Failed".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Scalar KPIs
// ---------------------------------------------------------------------------

pub fn total_count(view: &FilteredView<'_>) -> usize {
    view.len()
}

/// Percentage of `count` in `total`; `None` for an empty view.
fn percentage(count: usize, total: usize) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(count as f64 / total as f64 * 100.0)
    }
}

fn status_rate(view: &FilteredView<'_>, label: &str) -> Result<Option<f64>, SchemaError> {
    view.dataset.capabilities.require(&[STATUS])?;
    let hits = view
        .records()
        .filter(|rec| rec.get(STATUS).is_label(label))
        .count();
    Ok(percentage(hits, view.len()))
}

/// Share of records whose status is the "passed" label, in `[0, 100]`.
pub fn pass_rate(view: &FilteredView<'_>, labels: &StatusLabels) -> Result<Option<f64>, SchemaError> {
    status_rate(view, &labels.passed)
}

/// Share of records whose status is the "failed" label, in `[0, 100]`.
/// Other statuses count towards neither rate.
pub fn fail_rate(view: &FilteredView<'_>, labels: &StatusLabels) -> Result<Option<f64>, SchemaError> {
    status_rate(view, &labels.failed)
}

/// Records inspected after they were due (`due_date < inspection_date`).
/// A record missing either date is not overdue.
pub fn overdue_count(view: &FilteredView<'_>) -> Result<usize, SchemaError> {
    view.dataset
        .capabilities
        .require(&[INSPECTION_DATE, DUE_DATE])?;
    Ok(view
        .records()
        .filter(|rec| match (rec.date(DUE_DATE), rec.date(INSPECTION_DATE)) {
            (Some(due), Some(inspected)) => due < inspected,
            _ => false,
        })
        .count())
}

// ---------------------------------------------------------------------------
// Grouped aggregates
// ---------------------------------------------------------------------------

/// Count of records per distinct status. Null statuses are keyed as `Null`,
/// so the counts always sum to the view's length.
pub fn status_breakdown(view: &FilteredView<'_>) -> Result<BTreeMap<CellValue, usize>, SchemaError> {
    view.dataset.capabilities.require(&[STATUS])?;
    let mut counts = BTreeMap::new();
    for rec in view.records() {
        *counts.entry(rec.get(STATUS).clone()).or_insert(0) += 1;
    }
    Ok(counts)
}

/// Number of inspections in one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlyCount {
    /// Last day of the month; the bucket label.
    pub month_end: NaiveDate,
    pub count: usize,
}

/// Last calendar day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    date.with_day(1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

/// Inspections per month, oldest first. Only months holding at least one
/// record appear; records without an inspection date are skipped.
pub fn monthly_counts(view: &FilteredView<'_>) -> Result<Vec<MonthlyCount>, SchemaError> {
    view.dataset.capabilities.require(&[INSPECTION_DATE])?;
    let mut buckets: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for date in view.records().filter_map(|rec| rec.date(INSPECTION_DATE)) {
        *buckets.entry(month_end(date)).or_insert(0) += 1;
    }
    Ok(buckets
        .into_iter()
        .map(|(month_end, count)| MonthlyCount { month_end, count })
        .collect())
}

/// Counts keyed by `(asset_type, status)`.
pub type StatusByAssetType = BTreeMap<(CellValue, CellValue), usize>;

/// Cross tabulation of asset type against status. `Ok(None)` when the
/// dataset has no `asset_type` column.
pub fn status_by_asset_type(view: &FilteredView<'_>) -> Result<Option<StatusByAssetType>, SchemaError> {
    let caps = &view.dataset.capabilities;
    if !caps.asset_type {
        return Ok(None);
    }
    caps.require(&[STATUS])?;
    let mut counts = StatusByAssetType::new();
    for rec in view.records() {
        let key = (rec.get(ASSET_TYPE).clone(), rec.get(STATUS).clone());
        *counts.entry(key).or_insert(0) += 1;
    }
    Ok(Some(counts))
}

// ---------------------------------------------------------------------------
// Bundles handed to the presentation layer
// ---------------------------------------------------------------------------

/// The four headline metrics. Each rate or count carries its own schema
/// check, so one missing column does not hide the others.
#[derive(Debug, Clone, PartialEq)]
pub struct Kpis {
    pub total: usize,
    /// `Ok(None)` when no records survive filtering.
    pub pass_rate: Result<Option<f64>, SchemaError>,
    pub fail_rate: Result<Option<f64>, SchemaError>,
    pub overdue: Result<usize, SchemaError>,
}

impl Kpis {
    pub fn compute(view: &FilteredView<'_>, labels: &StatusLabels) -> Self {
        Self {
            total: total_count(view),
            pass_rate: pass_rate(view, labels),
            fail_rate: fail_rate(view, labels),
            overdue: overdue_count(view),
        }
    }

    /// `"60.0%"`, or `"n/a"` for an empty view.
    pub fn format_rate(rate: Option<f64>) -> String {
        match rate {
            Some(r) => format!("{r:.1}%"),
            None => "n/a".to_string(),
        }
    }
}

/// Everything the dashboard renders for one filter state.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub kpis: Kpis,
    pub status_breakdown: Result<BTreeMap<CellValue, usize>, SchemaError>,
    pub monthly_counts: Result<Vec<MonthlyCount>, SchemaError>,
    pub status_by_asset_type: Result<Option<StatusByAssetType>, SchemaError>,
}

impl Dashboard {
    pub fn compute(view: &FilteredView<'_>, labels: &StatusLabels) -> Self {
        Self {
            kpis: Kpis::compute(view, labels),
            status_breakdown: status_breakdown(view),
            monthly_counts: monthly_counts(view),
            status_by_asset_type: status_by_asset_type(view),
        }
    }

    /// Distinct schema errors across all parts, in display order.
    pub fn errors(&self) -> Vec<&SchemaError> {
        let candidates = [
            self.kpis.pass_rate.as_ref().err(),
            self.kpis.fail_rate.as_ref().err(),
            self.kpis.overdue.as_ref().err(),
            self.status_breakdown.as_ref().err(),
            self.monthly_counts.as_ref().err(),
            self.status_by_asset_type.as_ref().err(),
        ];
        let mut errors: Vec<&SchemaError> = Vec::new();
        for e in candidates.into_iter().flatten() {
            if !errors.contains(&e) {
                errors.push(e);
            }
        }
        errors
    }
}
