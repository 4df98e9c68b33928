use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::aggregate::StatusLabels;
use crate::data::model::CellValue;

const PASSED_COLOR: Color32 = Color32::from_rgb(76, 175, 80);
const FAILED_COLOR: Color32 = Color32::from_rgb(229, 57, 53);

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            // Offset keeps generated hues away from pure red.
            let hue = 30.0 + (i as f32 / n as f32) * 300.0;
            let hsl = Hsl::new(hue, 0.65, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: status value → Color32
// ---------------------------------------------------------------------------

/// Maps the status values of a dataset to colours shared by every chart.
/// The pass / fail labels get fixed green / red.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<CellValue, Color32>,
    default_color: Color32,
}

impl ColorMap {
    pub fn for_statuses(statuses: &BTreeSet<CellValue>, labels: &StatusLabels) -> Self {
        let others: Vec<&CellValue> = statuses
            .iter()
            .filter(|v| !v.is_label(&labels.passed) && !v.is_label(&labels.failed))
            .collect();
        let palette = generate_palette(others.len());

        let mut mapping: BTreeMap<CellValue, Color32> = others
            .into_iter()
            .zip(palette)
            .map(|(v, c)| (v.clone(), c))
            .collect();
        mapping.insert(CellValue::from(labels.passed.as_str()), PASSED_COLOR);
        mapping.insert(CellValue::from(labels.failed.as_str()), FAILED_COLOR);

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a given status value.
    pub fn color_for(&self, value: &CellValue) -> Color32 {
        self.mapping
            .get(value)
            .copied()
            .unwrap_or(self.default_color)
    }
}
