use std::path::PathBuf;
use std::sync::Arc;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::config::SourceKind;
use crate::data::loader::DataSource;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – data source and filter widgets
// ---------------------------------------------------------------------------

/// Render the left panel: source picker, then filters for present columns.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Data Source");
    ui.separator();
    source_picker(ui, state);

    ui.add_space(8.0);
    ui.heading("Filters");
    ui.separator();

    let dataset = match &state.dataset {
        Some(ds) => Arc::clone(ds),
        None => {
            ui.label("No dataset loaded.");
            return;
        }
    };
    let caps = dataset.capabilities;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Per-column filter widgets (collapsible) ----
            for col in caps.categorical_filters() {
                let Some(all_values) = dataset.unique_values.get(col) else {
                    continue;
                };

                let n_selected = state
                    .filters
                    .categorical
                    .get(col)
                    .map_or(0, |selected| selected.len());
                let n_total = all_values.len();
                let header_text = format!("{}  ({n_selected}/{n_total})", pretty_column(col));

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(col)
                    .default_open(true)
                    .show(ui, |ui: &mut Ui| {
                        ui.horizontal(|ui: &mut Ui| {
                            if ui.small_button("All").clicked() {
                                state.select_all(col);
                            }
                            if ui.small_button("None").clicked() {
                                state.select_none(col);
                            }
                        });

                        for val in all_values {
                            let mut checked = state
                                .filters
                                .categorical
                                .get(col)
                                .is_some_and(|selected| selected.contains(val));
                            if ui.checkbox(&mut checked, val.to_string()).changed() {
                                state.toggle_filter_value(col, val);
                            }
                        }
                    });
            }

            // ---- Inspection date range ----
            if caps.date_filter() {
                if let Some(range) = state.filters.date_range {
                    ui.add_space(4.0);
                    ui.strong("Inspection Date Range");
                    let mut start = range.start;
                    let mut end = range.end;
                    ui.horizontal(|ui: &mut Ui| {
                        ui.label("From");
                        ui.add(DatePickerButton::new(&mut start).id_salt("inspection_start"));
                    });
                    ui.horizontal(|ui: &mut Ui| {
                        ui.label("To");
                        ui.add(DatePickerButton::new(&mut end).id_salt("inspection_end"));
                    });
                    state.set_date_range(start, end);

                    if state.date_range_reversed() {
                        ui.label(
                            RichText::new("Start date is after end date: nothing matches.")
                                .color(Color32::YELLOW),
                        );
                    }
                }
            }

            ui.add_space(8.0);
            if ui.button("Reset filters").clicked() {
                state.reset_filters();
            }
        });
}

fn source_picker(ui: &mut Ui, state: &mut AppState) {
    egui::ComboBox::from_id_salt("data_source")
        .selected_text(source_label(state.source_kind))
        .show_ui(ui, |ui: &mut Ui| {
            for kind in [SourceKind::Csv, SourceKind::Sqlite] {
                ui.selectable_value(&mut state.source_kind, kind, source_label(kind));
            }
        });

    match state.source_kind {
        SourceKind::Csv => {
            if ui.button("Open file…").clicked() {
                open_file_dialog(state);
            }
        }
        SourceKind::Sqlite => {
            ui.horizontal(|ui: &mut Ui| {
                ui.label("SQLite DB Path");
                if ui.small_button("Browse…").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .set_title("Open SQLite database")
                        .add_filter("SQLite", &["db", "sqlite", "sqlite3"])
                        .pick_file()
                    {
                        state.db_path = path.display().to_string();
                    }
                }
            });
            ui.text_edit_singleline(&mut state.db_path);
            ui.label("Table Name");
            ui.text_edit_singleline(&mut state.table_name);

            let ready = !state.db_path.trim().is_empty() && !state.table_name.trim().is_empty();
            if ui.add_enabled(ready, egui::Button::new("Load")).clicked() {
                let source = DataSource::Sqlite {
                    db_path: PathBuf::from(state.db_path.trim()),
                    table: state.table_name.trim().to_string(),
                };
                state.load_source(&source);
            }
        }
    }
}

fn source_label(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Csv => "CSV file",
        SourceKind::Sqlite => "SQLite database",
    }
}

/// `asset_type` → `Asset Type`.
fn pretty_column(column: &str) -> String {
    column
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(ds), Some(view)) = (&state.dataset, state.visible_view()) {
            ui.label(format!(
                "{} inspections loaded, {} visible",
                ds.len(),
                view.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open inspection data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.load_source(&DataSource::File(path));
    }
}
