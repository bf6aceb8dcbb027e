use eframe::egui::{self, Color32, DragValue, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::aggregate::{categorical_columns, scatter_candidates};
use crate::data::export::EXPORT_FILE_NAME;
use crate::data::filter::CATEGORICAL_FILTERS;
use crate::data::loader::DataSource;
use crate::data::normalize::Field;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – upload and filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Data ▶ Upload / Filters");
    if ui.button("Upload Excel (.xlsx) or CSV…").clicked() {
        open_file_dialog(state);
    }
    ui.separator();

    if state.data.is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.strong("Filters");
            date_range_filter(ui, state);

            for field in CATEGORICAL_FILTERS {
                categorical_filter(ui, state, field);
            }

            amount_filter(ui, state);
            ui.separator();
            scatter_controls(ui, state);
        });
}

fn date_range_filter(ui: &mut Ui, state: &mut AppState) {
    let Some(range) = state.criteria.date_range.or(state.options.date_bounds) else {
        return;
    };
    let (mut start, mut end) = (range.start, range.end);

    ui.label("Date range");
    let mut changed = false;
    ui.horizontal(|ui: &mut Ui| {
        changed |= ui
            .add(DatePickerButton::new(&mut start).id_salt("date_from"))
            .changed();
        ui.label("→");
        changed |= ui
            .add(DatePickerButton::new(&mut end).id_salt("date_to"))
            .changed();
    });
    if changed {
        state.set_date_range(start, end);
    }
}

/// Collapsible multi-select with All / None buttons.
fn categorical_filter(ui: &mut Ui, state: &mut AppState, field: Field) {
    let all_values = state.options.values(field).to_vec();
    if all_values.is_empty() {
        return;
    }

    let n_selected = state.criteria.selected(field).map_or(0, |s| s.len());
    let header_text = format!("{field}  ({n_selected}/{})", all_values.len());

    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt(field.name())
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    state.select_all(field);
                }
                if ui.small_button("None").clicked() {
                    state.select_none(field);
                }
            });
            if n_selected == 0 {
                ui.label(RichText::new("Nothing selected: showing all").italics());
            }

            for val in &all_values {
                let mut checked = state
                    .criteria
                    .selected(field)
                    .is_some_and(|s| s.contains(val));
                if ui.checkbox(&mut checked, val.to_string()).changed() {
                    state.toggle_filter_value(field, val);
                }
            }
        });
}

fn amount_filter(ui: &mut Ui, state: &mut AppState) {
    let Some((min, max)) = state.options.amount_bounds else {
        return;
    };
    let (mut lo, mut hi) = state.criteria.amount_range.unwrap_or((min, max));
    let speed = ((max - min) / 200.0).max(0.01);

    ui.label("Amount range");
    let mut changed = false;
    ui.horizontal(|ui: &mut Ui| {
        changed |= ui
            .add(DragValue::new(&mut lo).speed(speed).range(min..=hi).prefix("₹ "))
            .changed();
        ui.label("–");
        changed |= ui
            .add(DragValue::new(&mut hi).speed(speed).range(lo..=max).prefix("₹ "))
            .changed();
    });
    if changed {
        state.set_amount_range(lo, hi);
    }
}

fn scatter_controls(ui: &mut Ui, state: &mut AppState) {
    let Some(data) = &state.data else {
        return;
    };
    let candidates = scatter_candidates(data);
    if candidates.is_empty() {
        return;
    }
    let color_columns = categorical_columns(data);

    ui.strong("Scatter");
    let scatter = &mut state.scatter;

    let x_label = scatter.x.map(|f| f.name()).unwrap_or("-");
    egui::ComboBox::from_label("X axis")
        .selected_text(x_label)
        .show_ui(ui, |ui: &mut Ui| {
            for field in &candidates {
                ui.selectable_value(&mut scatter.x, Some(*field), field.name());
            }
        });

    let color_label = scatter.color_by.clone().unwrap_or_else(|| "None".to_string());
    egui::ComboBox::from_label("Color by")
        .selected_text(color_label)
        .show_ui(ui, |ui: &mut Ui| {
            ui.selectable_value(&mut scatter.color_by, None, "None");
            for col in &color_columns {
                ui.selectable_value(&mut scatter.color_by, Some(col.clone()), col.as_str());
            }
        });

    ui.checkbox(&mut scatter.trendline, "Add trendline");
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
            let can_export = state.filtered.is_some();
            if ui
                .add_enabled(can_export, egui::Button::new("Export filtered CSV…"))
                .clicked()
            {
                save_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(data), Some(filtered)) = (&state.data, &state.filtered) {
            ui.label(format!(
                "{} transactions loaded, {} after filters",
                data.len(),
                filtered.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open UPI transactions")
        .add_filter("Supported files", &["xlsx", "xls", "csv", "parquet", "json"])
        .add_filter("Excel", &["xlsx", "xls"])
        .add_filter("CSV", &["csv"])
        .pick_file();

    let Some(path) = file else {
        return;
    };
    match DataSource::upload_from_path(&path) {
        Ok(source) => state.load(source),
        Err(e) => {
            log::error!("Failed to read {}: {e}", path.display());
            state.status_message = Some(format!("Could not read uploaded file: {e}"));
        }
    }
}

pub fn save_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Download filtered data (CSV)")
        .set_file_name(EXPORT_FILE_NAME)
        .add_filter("CSV", &["csv"])
        .save_file();

    let Some(path) = file else {
        return;
    };
    match state.export_filtered(&path) {
        Ok(()) => state.status_message = None,
        Err(e) => {
            log::error!("Export failed: {e:#}");
            state.status_message = Some(format!("Export failed: {e:#}"));
        }
    }
}
