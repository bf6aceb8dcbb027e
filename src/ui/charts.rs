use std::f64::consts::{FRAC_PI_2, TAU};
use std::ops::RangeInclusive;

use eframe::egui::{Color32, RichText, Stroke, Ui};
use egui_plot::{
    Bar, BarChart, GridMark, Legend, Line, Plot, PlotPoint, PlotPoints, Points, Polygon, Text,
};

use crate::color::{blues, ColorMap, ACCENT};
use crate::config::DashboardConfig;
use crate::data::aggregate::{
    hour_weekday_matrix, linear_fit, monthly_trend, scatter_series, top_by_amount, value_counts,
    weekday_name, HourWeekdayMatrix,
};
use crate::data::model::CellValue;
use crate::data::normalize::{Field, NormalizedTable};
use crate::state::ScatterSettings;

const CHART_HEIGHT: f32 = 280.0;
const DONUT_HOLE: f64 = 0.4;

// ---------------------------------------------------------------------------
// Chart section (central panel)
// ---------------------------------------------------------------------------

/// Render every chart whose inputs the filtered table carries. Charts for
/// absent columns are skipped without a placeholder.
pub fn visualizations(
    ui: &mut Ui,
    data: &NormalizedTable,
    scatter: &ScatterSettings,
    config: &DashboardConfig,
) {
    ui.heading("Visualizations");

    if let Some(trend) = monthly_trend(data) {
        section(ui, "Monthly trend: total transaction amount");
        trend_chart(ui, &trend);
    }

    ui.columns(2, |cols: &mut [Ui]| {
        let counts = value_counts(data, Field::PaymentMethod)
            .map(|c| ("Payment Method (by count)", "payment_methods", c))
            .or_else(|| {
                value_counts(data, Field::BankNameSent)
                    .map(|c| ("Sending Bank (by count)", "sending_banks", c))
            });
        if let Some((title, id, counts)) = counts {
            section(&mut cols[0], title);
            let rows: Vec<(String, f64)> = counts
                .iter()
                .map(|(v, n)| (v.to_string(), *n as f64))
                .collect();
            bar_chart(&mut cols[0], id, "Count", &rows);
        }

        if let Some(types) = value_counts(data, Field::TransactionType) {
            section(&mut cols[1], "Transaction Type share");
            donut_chart(&mut cols[1], "transaction_types", &types);
        }
    });

    if let Some(top) = top_by_amount(data, Field::MerchantName, config.top_merchants) {
        section(
            ui,
            &format!("Top {} merchants by amount", config.top_merchants),
        );
        let rows: Vec<(String, f64)> = top.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        bar_chart(ui, "top_merchants", "Total Amount (₹)", &rows);
    }

    scatter_chart(ui, data, scatter);

    if let Some(matrix) = hour_weekday_matrix(data) {
        section(ui, "Heatmap: activity by hour & weekday");
        heatmap(ui, &matrix);
    }
}

fn section(ui: &mut Ui, title: &str) {
    ui.add_space(8.0);
    ui.label(RichText::new(title).strong().size(16.0));
}

// ---------------------------------------------------------------------------
// Individual charts
// ---------------------------------------------------------------------------

fn trend_chart(ui: &mut Ui, trend: &[(String, f64)]) {
    let labels: Vec<String> = trend.iter().map(|(m, _)| m.clone()).collect();
    let line: PlotPoints = trend
        .iter()
        .enumerate()
        .map(|(i, (_, v))| [i as f64, *v])
        .collect();
    let markers: PlotPoints = trend
        .iter()
        .enumerate()
        .map(|(i, (_, v))| [i as f64, *v])
        .collect();

    Plot::new("monthly_trend")
        .height(CHART_HEIGHT)
        .x_axis_label("Month")
        .y_axis_label("Total Amount (₹)")
        .x_axis_formatter(category_formatter(labels))
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(line).color(ACCENT).width(3.0).name("Amount"));
            plot_ui.points(Points::new(markers).color(ACCENT).radius(4.0));
        });
}

/// Vertical bars in the given order, labelled on the x axis.
fn bar_chart(ui: &mut Ui, id: &str, y_label: &str, rows: &[(String, f64)]) {
    let labels: Vec<String> = rows.iter().map(|(l, _)| l.clone()).collect();
    let bars: Vec<Bar> = rows
        .iter()
        .enumerate()
        .map(|(i, (label, v))| Bar::new(i as f64, *v).name(label).width(0.6))
        .collect();

    Plot::new(id)
        .height(CHART_HEIGHT)
        .y_axis_label(y_label)
        .x_axis_formatter(category_formatter(labels))
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(ACCENT));
        });
}

/// Donut chart: one wedge per category, clockwise from 12 o'clock.
fn donut_chart(ui: &mut Ui, id: &str, counts: &[(CellValue, usize)]) {
    let sizes: Vec<usize> = counts.iter().map(|(_, n)| *n).collect();
    let total: usize = sizes.iter().sum();
    let angles = wedge_angles(&sizes);
    let colors = ColorMap::new(counts.iter().map(|(v, _)| v));

    Plot::new(id)
        .height(CHART_HEIGHT)
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .legend(Legend::default())
        .show(ui, |plot_ui| {
            for ((value, n), (start, end)) in counts.iter().zip(angles) {
                let share = 100.0 * *n as f64 / total.max(1) as f64;
                let outline = PlotPoints::from(donut_wedge(start, end, DONUT_HOLE, 1.0));
                plot_ui.polygon(
                    Polygon::new(outline)
                        .fill_color(colors.color_for(value))
                        .stroke(Stroke::new(1.0, Color32::WHITE))
                        .name(format!("{value} ({share:.1}%)")),
                );
            }
        });
}

fn scatter_chart(ui: &mut Ui, data: &NormalizedTable, settings: &ScatterSettings) {
    let Some(x) = settings.x else {
        return;
    };
    let Some(groups) = scatter_series(data, x, settings.color_by.as_deref()) else {
        return;
    };

    section(ui, &format!("Scatter: Amount vs {x}"));
    let colors = ColorMap::new(groups.iter().map(|g| &g.key));
    let fit = if settings.trendline {
        linear_fit(groups.iter().flat_map(|g| &g.points))
    } else {
        None
    };
    let x_span = groups
        .iter()
        .flat_map(|g| &g.points)
        .fold(None, |acc: Option<(f64, f64)>, p| match acc {
            None => Some((p[0], p[0])),
            Some((lo, hi)) => Some((lo.min(p[0]), hi.max(p[0]))),
        });

    Plot::new("amount_scatter")
        .height(CHART_HEIGHT)
        .x_axis_label(x.name())
        .y_axis_label("Amount")
        .legend(Legend::default())
        .show(ui, |plot_ui| {
            for group in &groups {
                let (name, color) = match &settings.color_by {
                    Some(_) => (group.key.to_string(), colors.color_for(&group.key)),
                    None => ("Amount".to_string(), ACCENT),
                };
                plot_ui.points(
                    Points::new(PlotPoints::from(group.points.clone()))
                        .radius(2.5)
                        .color(color)
                        .name(name),
                );
            }
            if let (Some(fit), Some((lo, hi))) = (fit, x_span) {
                let ends = vec![[lo, fit.predict(lo)], [hi, fit.predict(hi)]];
                plot_ui.line(
                    Line::new(PlotPoints::from(ends))
                        .color(Color32::DARK_GRAY)
                        .width(2.0)
                        .name("OLS trendline"),
                );
            }
        });
}

fn heatmap(ui: &mut Ui, matrix: &HourWeekdayMatrix) {
    let max = matrix.max_count().max(1) as f32;
    let labels: Vec<String> = matrix
        .weekdays
        .iter()
        .map(|d| weekday_name(*d).to_string())
        .collect();

    Plot::new("hour_weekday_heatmap")
        .height(CHART_HEIGHT * 1.5)
        .x_axis_label("Weekday")
        .y_axis_label("Hour of day")
        .x_axis_formatter(category_formatter(labels))
        .show_grid(false)
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for (row, hour) in matrix.hours.iter().enumerate() {
                for (col, count) in matrix.counts[row].iter().enumerate() {
                    let (x, y) = (col as f64, *hour as f64);
                    let cell = vec![
                        [x - 0.5, y - 0.5],
                        [x + 0.5, y - 0.5],
                        [x + 0.5, y + 0.5],
                        [x - 0.5, y + 0.5],
                    ];
                    plot_ui.polygon(
                        Polygon::new(PlotPoints::from(cell))
                            .fill_color(blues(*count as f32 / max))
                            .stroke(Stroke::NONE),
                    );
                    if *count > 0 {
                        plot_ui.text(Text::new(PlotPoint::new(x, y), count.to_string()));
                    }
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Geometry and axis helpers
// ---------------------------------------------------------------------------

/// Axis formatter that prints `labels[i]` at integer positions only.
fn category_formatter(
    labels: Vec<String>,
) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String + 'static {
    move |mark, _range| category_label(&labels, mark.value)
}

fn category_label(labels: &[String], value: f64) -> String {
    let idx = value.round();
    if (value - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

/// Start/end angles (radians, clockwise from 12 o'clock) for each slice.
fn wedge_angles(sizes: &[usize]) -> Vec<(f64, f64)> {
    let total: usize = sizes.iter().sum();
    if total == 0 {
        return vec![(0.0, 0.0); sizes.len()];
    }
    let mut start = 0.0;
    sizes
        .iter()
        .map(|&n| {
            let end = start + TAU * n as f64 / total as f64;
            let span = (start, end);
            start = end;
            span
        })
        .collect()
}

/// Closed outline of a ring segment: outer arc forward, inner arc back.
fn donut_wedge(start: f64, end: f64, inner: f64, outer: f64) -> Vec<[f64; 2]> {
    let steps = (((end - start) / TAU) * 64.0).ceil().max(1.0) as usize;
    let point = |angle: f64, r: f64| {
        let theta = FRAC_PI_2 - angle;
        [r * theta.cos(), r * theta.sin()]
    };

    let mut outline = Vec::with_capacity(2 * (steps + 1));
    for i in 0..=steps {
        outline.push(point(start + (end - start) * i as f64 / steps as f64, outer));
    }
    for i in (0..=steps).rev() {
        outline.push(point(start + (end - start) * i as f64 / steps as f64, inner));
    }
    outline
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wedges_cover_the_full_circle() {
        let angles = wedge_angles(&[2, 1, 1]);
        assert_eq!(angles.len(), 3);
        assert_eq!(angles[0].0, 0.0);
        assert!((angles[0].1 - TAU / 2.0).abs() < 1e-12);
        assert!((angles[2].1 - TAU).abs() < 1e-12);
        assert_eq!(wedge_angles(&[0, 0]), vec![(0.0, 0.0), (0.0, 0.0)]);
    }

    #[test]
    fn wedge_outline_spans_both_radii() {
        let outline = donut_wedge(0.0, TAU / 4.0, 0.4, 1.0);
        let first = outline.first().unwrap();
        let last = outline.last().unwrap();
        // Starts at 12 o'clock on the outer ring, ends there on the inner ring.
        assert!((first[0]).abs() < 1e-12 && (first[1] - 1.0).abs() < 1e-12);
        assert!((last[0]).abs() < 1e-12 && (last[1] - 0.4).abs() < 1e-12);
        let radii: Vec<f64> = outline.iter().map(|p| p[0].hypot(p[1])).collect();
        assert!(radii.iter().all(|r| (r - 1.0).abs() < 1e-9 || (r - 0.4).abs() < 1e-9));
    }

    #[test]
    fn category_labels_only_on_integer_ticks() {
        let labels = vec!["2024-01".to_string(), "2024-02".to_string()];
        assert_eq!(category_label(&labels, 1.0), "2024-02");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, -1.0), "");
        assert_eq!(category_label(&labels, 5.0), "");
    }
}
