use eframe::egui::{CollapsingHeader, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::filter::FilteredView;

const ROW_HEIGHT: f32 = 18.0;

// ---------------------------------------------------------------------------
// Raw data view
// ---------------------------------------------------------------------------

/// Collapsible table of the filtered rows, all columns in source order.
pub fn raw_data(ui: &mut Ui, view: &FilteredView<'_>) {
    CollapsingHeader::new(format!("🔍 View Raw Data ({} rows)", view.len()))
        .id_salt("raw_data")
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            let columns = &view.dataset.column_names;
            if columns.is_empty() {
                ui.label("The dataset has no columns.");
                return;
            }
            let records = &view.dataset.records;

            TableBuilder::new(ui)
                .striped(true)
                .resizable(true)
                .max_scroll_height(360.0)
                .columns(Column::auto().at_least(80.0), columns.len())
                .header(ROW_HEIGHT + 2.0, |mut header| {
                    for name in columns {
                        header.col(|ui: &mut Ui| {
                            ui.strong(name);
                        });
                    }
                })
                .body(|body| {
                    body.rows(ROW_HEIGHT, view.len(), |mut row| {
                        let record = &records[view.indices[row.index()]];
                        for name in columns {
                            row.col(|ui: &mut Ui| {
                                ui.label(record.get(name).to_string());
                            });
                        }
                    });
                });
        });
}
