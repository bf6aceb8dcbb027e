use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

use crate::data::model::CellValue;

/// Dashboard accent blue (`#0b66c2`), used for single-series charts.
pub const ACCENT: Color32 = Color32::from_rgb(0x0b, 0x66, 0xc2);

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
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            to_color32(hsl.into_color())
        })
        .collect()
}

/// Sequential white → deep blue scale for heatmap cells; `t` in `[0, 1]`.
pub fn blues(t: f32) -> Color32 {
    let light = LinSrgb::new(0.97, 0.98, 1.0);
    let dark: LinSrgb = Srgb::new(0.03, 0.19, 0.42).into_linear();
    let mixed = light.mix(dark, t.clamp(0.0, 1.0));
    to_color32(Srgb::from_linear(mixed))
}

fn to_color32(rgb: Srgb) -> Color32 {
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

// ---------------------------------------------------------------------------
// Color mapping: cell value → Color32
// ---------------------------------------------------------------------------

/// Maps distinct values of a chosen column to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<CellValue, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map from the values in display order.
    pub fn new<'a>(values: impl IntoIterator<Item = &'a CellValue>) -> Self {
        let values: Vec<&CellValue> = values.into_iter().collect();
        let palette = generate_palette(values.len());
        let mapping = values
            .into_iter()
            .zip(palette)
            .map(|(v, c)| (v.clone(), c))
            .collect();

        ColorMap {
            mapping,
            default_color: ACCENT,
        }
    }

    /// Look up the colour for a given value.
    pub fn color_for(&self, value: &CellValue) -> Color32 {
        self.mapping
            .get(value)
            .copied()
            .unwrap_or(self.default_color)
    }
}
