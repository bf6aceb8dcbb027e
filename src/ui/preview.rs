use eframe::egui::{self, RichText, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};

use crate::data::aggregate::summary;
use crate::data::normalize::NormalizedTable;

// ---------------------------------------------------------------------------
// Key metrics
// ---------------------------------------------------------------------------

/// Count, total, mean and median of the filtered amounts.
pub fn metrics_row(ui: &mut Ui, data: &NormalizedTable) {
    let s = summary(data);
    let amount = s.amount.as_ref();
    let cards = [
        ("Transactions (filtered)", group_thousands(s.rows as f64, 0)),
        ("Total Amount", format_rupees(amount.map(|a| a.sum))),
        ("Avg Amount", format_rupees(amount.and_then(|a| a.mean))),
        ("Median Amount", format_rupees(amount.and_then(|a| a.median))),
    ];

    ui.label(RichText::new("Key Metrics").strong().size(16.0));
    ui.columns(cards.len(), |cols: &mut [Ui]| {
        for (col, (label, value)) in cols.iter_mut().zip(cards) {
            col.label(RichText::new(label).color(crate::color::ACCENT));
            col.label(RichText::new(value).size(22.0).strong());
        }
    });
}

fn format_rupees(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("₹ {}", group_thousands(v, 2)),
        None => "-".to_string(),
    }
}

/// `1234567.891` → `1,234,567.89`.
fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

// ---------------------------------------------------------------------------
// Data preview
// ---------------------------------------------------------------------------

/// Sampled rows of the filtered table, re-indexed from zero.
/// Returns `true` when the download button was clicked.
pub fn data_preview(ui: &mut Ui, data: &NormalizedTable, sample: &[usize]) -> bool {
    ui.heading("Data preview");
    ui.label(format!("{} of {} filtered rows", sample.len(), data.len()));

    let columns = data.table.columns();
    if columns.is_empty() {
        return false;
    }

    egui::ScrollArea::horizontal()
        .id_salt("preview_scroll")
        .show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .max_scroll_height(400.0)
                .column(TableColumn::auto().at_least(30.0))
                .columns(TableColumn::auto().at_least(80.0).resizable(true), columns.len())
                .header(20.0, |mut header| {
                    header.col(|ui| {
                        ui.strong("#");
                    });
                    for col in columns {
                        header.col(|ui| {
                            ui.strong(&col.name);
                        });
                    }
                })
                .body(|body| {
                    body.rows(18.0, sample.len(), |mut row| {
                        let position = row.index();
                        let source = sample[position];
                        row.col(|ui| {
                            ui.label(position.to_string());
                        });
                        for col in columns {
                            row.col(|ui| {
                                let cell = &col.values[source];
                                if cell.is_missing() {
                                    ui.weak("-");
                                } else {
                                    ui.label(cell.to_string());
                                }
                            });
                        }
                    });
                });
        });

    ui.add_space(6.0);
    ui.button("Download filtered data (CSV)").clicked()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(group_thousands(1234567.891, 2), "1,234,567.89");
        assert_eq!(group_thousands(999.0, 0), "999");
        assert_eq!(group_thousands(1000.0, 0), "1,000");
        assert_eq!(group_thousands(-4500.5, 2), "-4,500.50");
        assert_eq!(group_thousands(0.0, 2), "0.00");
    }

    #[test]
    fn missing_amounts_render_as_dash() {
        assert_eq!(format_rupees(None), "-");
        assert_eq!(format_rupees(Some(400.0)), "₹ 400.00");
    }
}
