use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::TAU;

use chrono::{Datelike, NaiveDate};
use eframe::egui::{Color32, RichText, Stroke, Ui};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points, Polygon};

use crate::color::ColorMap;
use crate::data::aggregate::{Kpis, MonthlyCount, StatusByAssetType};
use crate::data::columns::SchemaError;
use crate::data::model::CellValue;
use crate::state::AppState;
use crate::ui::table;

const CHART_HEIGHT: f32 = 280.0;

// ---------------------------------------------------------------------------
// Dashboard (central panel)
// ---------------------------------------------------------------------------

/// Render KPIs, charts and the raw table in the central panel.
///
/// A part whose columns are missing shows its schema error in place; the
/// other parts still render.
pub fn dashboard(ui: &mut Ui, state: &AppState) {
    let (Some(snapshot), Some(view)) = (&state.snapshot, state.visible_view()) else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Load inspection data to begin  (File → Open…)");
        });
        return;
    };
    let dash = &snapshot.dashboard;

    let fallback;
    let colors = match &state.status_colors {
        Some(map) => map,
        None => {
            fallback = ColorMap::for_statuses(&BTreeSet::new(), &state.config.status_labels);
            &fallback
        }
    };

    for e in dash.errors() {
        schema_error(ui, e);
    }

    kpi_row(ui, &dash.kpis);
    ui.separator();

    if dash.kpis.total == 0 {
        ui.label("No inspections match the current filters.");
    }

    ui.columns(2, |cols| {
        cols[0].strong("Inspection Status Breakdown");
        match &dash.status_breakdown {
            Ok(breakdown) => status_pie(&mut cols[0], breakdown, colors),
            Err(e) => schema_error(&mut cols[0], e),
        }
        cols[1].strong("Inspections per Month");
        match &dash.monthly_counts {
            Ok(monthly) => monthly_line(&mut cols[1], monthly),
            Err(e) => schema_error(&mut cols[1], e),
        }
    });

    ui.separator();
    ui.strong("Inspection Results by Asset Type");
    match &dash.status_by_asset_type {
        Ok(Some(cross)) => asset_type_bars(ui, cross, colors),
        Ok(None) => {
            ui.label("No asset_type column in this dataset.");
        }
        Err(e) => schema_error(ui, e),
    }

    ui.separator();
    table::raw_data(ui, &view);
}

fn schema_error(ui: &mut Ui, e: &SchemaError) {
    ui.label(RichText::new(format!("Cannot compute: {e}")).color(Color32::RED));
}

// ---------------------------------------------------------------------------
// KPIs
// ---------------------------------------------------------------------------

/// Tile text for a KPI; a schema error shows as a dash.
fn kpi_text<T>(value: &Result<T, SchemaError>, show: impl Fn(&T) -> String) -> String {
    value.as_ref().map_or_else(|_| "–".to_string(), show)
}

fn kpi_row(ui: &mut Ui, kpis: &Kpis) {
    let tiles = [
        ("Total Inspections", kpis.total.to_string()),
        ("Pass Rate (%)", kpi_text(&kpis.pass_rate, |r| Kpis::format_rate(*r))),
        ("Fail Rate (%)", kpi_text(&kpis.fail_rate, |r| Kpis::format_rate(*r))),
        ("Overdue Inspections", kpi_text(&kpis.overdue, |n| n.to_string())),
    ];
    ui.columns(tiles.len(), |cols| {
        for (col, (label, value)) in cols.iter_mut().zip(tiles) {
            col.vertical(|ui: &mut Ui| {
                ui.label(label);
                ui.heading(RichText::new(value).strong());
            });
        }
    });
}

// ---------------------------------------------------------------------------
// Status breakdown pie
// ---------------------------------------------------------------------------

/// Points of a pie slice from `start` to `end` radians, centred on the origin.
fn slice_points(start: f64, end: f64) -> Vec<[f64; 2]> {
    let steps = (((end - start) / TAU) * 90.0).ceil().max(1.0) as usize;
    let mut points = Vec::with_capacity(steps + 2);
    points.push([0.0, 0.0]);
    for i in 0..=steps {
        let angle = start + (end - start) * i as f64 / steps as f64;
        points.push([angle.cos(), angle.sin()]);
    }
    points
}

fn status_pie(ui: &mut Ui, breakdown: &BTreeMap<CellValue, usize>, colors: &ColorMap) {
    let total: usize = breakdown.values().sum();

    Plot::new("status_pie")
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .show(ui, |plot_ui| {
            if total == 0 {
                return;
            }
            // Start at twelve o'clock, run clockwise.
            let mut angle = TAU / 4.0;
            for (status, &count) in breakdown {
                let sweep = count as f64 / total as f64 * TAU;
                let points: PlotPoints = slice_points(angle - sweep, angle).into_iter().collect();
                let share = count as f64 / total as f64 * 100.0;
                plot_ui.polygon(
                    Polygon::new(points)
                        .name(format!("{status} ({count}, {share:.1}%)"))
                        .fill_color(colors.color_for(status))
                        .stroke(Stroke::new(1.0, Color32::WHITE)),
                );
                angle -= sweep;
            }
        });
}

// ---------------------------------------------------------------------------
// Inspections per month
// ---------------------------------------------------------------------------

fn month_label(x: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(x.round() as i32)
        .map(|d| d.format("%b %Y").to_string())
        .unwrap_or_default()
}

fn monthly_line(ui: &mut Ui, monthly: &[MonthlyCount]) {
    let series: Vec<[f64; 2]> = monthly
        .iter()
        .map(|m| [m.month_end.num_days_from_ce() as f64, m.count as f64])
        .collect();

    Plot::new("monthly_counts")
        .height(CHART_HEIGHT)
        .x_axis_label("Month")
        .y_axis_label("Inspections")
        .x_axis_formatter(|mark, _range| month_label(mark.value))
        .label_formatter(|_name, point| {
            format!("{}: {:.0}", month_label(point.x), point.y)
        })
        .include_y(0.0)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            let line: PlotPoints = series.iter().copied().collect();
            let markers: PlotPoints = series.iter().copied().collect();
            plot_ui.line(Line::new(line).name("Inspections per Month").width(2.0));
            plot_ui.points(Points::new(markers).radius(3.5));
        });
}

// ---------------------------------------------------------------------------
// Status by asset type (grouped bars)
// ---------------------------------------------------------------------------

/// Distinct asset types and statuses of the cross tabulation, sorted.
fn table_axes(table: &StatusByAssetType) -> (Vec<CellValue>, Vec<CellValue>) {
    let assets: BTreeSet<&CellValue> = table.keys().map(|(asset, _)| asset).collect();
    let statuses: BTreeSet<&CellValue> = table.keys().map(|(_, status)| status).collect();
    (
        assets.into_iter().cloned().collect(),
        statuses.into_iter().cloned().collect(),
    )
}

fn asset_type_bars(ui: &mut Ui, table: &StatusByAssetType, colors: &ColorMap) {
    let (assets, statuses) = table_axes(table);
    let group_width = 0.8;
    let bar_width = group_width / statuses.len().max(1) as f64;
    let asset_names: Vec<String> = assets.iter().map(|a| a.to_string()).collect();

    Plot::new("status_by_asset_type")
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .y_axis_label("Inspections")
        .x_axis_formatter(move |mark, _range| {
            let idx = mark.value.round();
            if (mark.value - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            asset_names.get(idx as usize).cloned().unwrap_or_default()
        })
        .include_y(0.0)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for (j, status) in statuses.iter().enumerate() {
                let offset = -group_width / 2.0 + bar_width * (j as f64 + 0.5);
                let bars: Vec<Bar> = assets
                    .iter()
                    .enumerate()
                    .filter_map(|(i, asset)| {
                        let count = *table.get(&(asset.clone(), status.clone()))?;
                        Some(
                            Bar::new(i as f64 + offset, count as f64)
                                .width(bar_width * 0.95)
                                .name(format!("{asset} / {status}")),
                        )
                    })
                    .collect();
                plot_ui.bar_chart(
                    BarChart::new(bars)
                        .name(status.to_string())
                        .color(colors.color_for(status)),
                );
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_closes_at_centre_and_spans_arc() {
        let points = slice_points(0.0, TAU / 4.0);
        assert_eq!(points[0], [0.0, 0.0]);
        let first = points[1];
        let last = *points.last().unwrap();
        assert!((first[0] - 1.0).abs() < 1e-9 && first[1].abs() < 1e-9);
        assert!(last[0].abs() < 1e-9 && (last[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn kpi_text_shows_dash_for_schema_errors() {
        let missing: Result<usize, SchemaError> = Err(SchemaError::MissingColumn("due_date"));
        assert_eq!(kpi_text(&missing, |n| n.to_string()), "–");
        let rate: Result<Option<f64>, SchemaError> = Ok(Some(62.5));
        assert_eq!(kpi_text(&rate, |r| Kpis::format_rate(*r)), "62.5%");
    }

    #[test]
    fn month_label_round_trips_days() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(month_label(d.num_days_from_ce() as f64), "Feb 2024");
    }

    #[test]
    fn table_axes_are_sorted_and_distinct() {
        let mut table = StatusByAssetType::new();
        table.insert((CellValue::from("Valve"), CellValue::from("Passed")), 1);
        table.insert((CellValue::from("Pump"), CellValue::from("Failed")), 2);
        table.insert((CellValue::from("Pump"), CellValue::from("Passed")), 3);
        let (assets, statuses) = table_axes(&table);
        assert_eq!(assets, vec![CellValue::from("Pump"), CellValue::from("Valve")]);
        assert_eq!(statuses, vec![CellValue::from("Failed"), CellValue::from("Passed")]);
    }
}
