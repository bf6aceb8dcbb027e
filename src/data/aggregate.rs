use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Weekday};

use super::model::CellValue;
use super::normalize::{Field, NormalizedTable, HOUR, WEEKDAY, YEAR_MONTH};

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

/// Statistics over the non-missing amounts. Missing amounts are skipped,
/// never counted as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct AmountStats {
    pub count: usize,
    pub sum: f64,
    pub mean: Option<f64>,
    pub median: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub rows: usize,
    /// `None` when the table has no `Amount` column.
    pub amount: Option<AmountStats>,
}

pub fn summary(data: &NormalizedTable) -> Summary {
    let amount = data.field(Field::Amount).map(|col| {
        let mut values: Vec<f64> = col.values.iter().filter_map(CellValue::as_f64).collect();
        let count = values.len();
        let sum: f64 = values.iter().sum();
        let mean = (count > 0).then(|| sum / count as f64);
        values.sort_by(f64::total_cmp);
        let median = match count {
            0 => None,
            n if n % 2 == 1 => Some(values[n / 2]),
            n => Some((values[n / 2 - 1] + values[n / 2]) / 2.0),
        };
        AmountStats {
            count,
            sum,
            mean,
            median,
        }
    });

    Summary {
        rows: data.len(),
        amount,
    }
}

// ---------------------------------------------------------------------------
// Grouped aggregates
// ---------------------------------------------------------------------------

/// Label of the trend group collecting rows whose date did not parse.
pub const MISSING_MONTH: &str = "NaT";

/// Total amount per `YearMonth`, ascending by month label. Rows without a
/// parsed date are summed into a trailing [`MISSING_MONTH`] group, so the
/// totals always add up to the amount sum.
///
/// `None` only when the table has no `TransactionDate` or `Amount` column.
pub fn monthly_trend(data: &NormalizedTable) -> Option<Vec<(String, f64)>> {
    if !data.capabilities.has_month_grouping() {
        return None;
    }
    let amounts = data.field(Field::Amount)?;
    let months = data.table.column(YEAR_MONTH)?;

    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    let mut undated: Option<f64> = None;
    for (month, amount) in months.values.iter().zip(&amounts.values) {
        let total = match month {
            CellValue::Text(label) => totals.entry(label.as_str()).or_insert(0.0),
            _ => undated.get_or_insert(0.0),
        };
        if let Some(a) = amount.as_f64() {
            *total += a;
        }
    }

    let mut trend: Vec<(String, f64)> = totals
        .into_iter()
        .map(|(label, total)| (label.to_string(), total))
        .collect();
    if let Some(total) = undated {
        trend.push((MISSING_MONTH.to_string(), total));
    }
    Some(trend)
}

/// Frequency of each non-missing value, most frequent first; ties keep the
/// order of first appearance.
pub fn value_counts(data: &NormalizedTable, field: Field) -> Option<Vec<(CellValue, usize)>> {
    let col = data.field(field)?;

    let mut counts: Vec<(CellValue, usize)> = Vec::new();
    let mut index: HashMap<&CellValue, usize> = HashMap::new();
    for value in col.values.iter().filter(|v| !v.is_missing()) {
        match index.get(value) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(value, counts.len());
                counts.push((value.clone(), 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    Some(counts)
}

/// Sum `Amount` per key, largest first, at most `n` groups.
/// Groups are visited in key order, so equal totals stay key-sorted.
pub fn top_by_amount(
    data: &NormalizedTable,
    field: Field,
    n: usize,
) -> Option<Vec<(CellValue, f64)>> {
    let keys = data.field(field)?;
    let amounts = data.field(Field::Amount)?;

    let mut totals: BTreeMap<&CellValue, f64> = BTreeMap::new();
    for (key, amount) in keys.values.iter().zip(&amounts.values) {
        if key.is_missing() {
            continue;
        }
        let total = totals.entry(key).or_insert(0.0);
        if let Some(a) = amount.as_f64() {
            *total += a;
        }
    }

    let mut ranked: Vec<(CellValue, f64)> =
        totals.into_iter().map(|(k, v)| (k.clone(), v)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(n);
    Some(ranked)
}

// ---------------------------------------------------------------------------
// Hour × weekday activity
// ---------------------------------------------------------------------------

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Transaction counts by hour (rows) and weekday (columns).
#[derive(Debug, Clone, PartialEq)]
pub struct HourWeekdayMatrix {
    /// Hours present in the data, ascending.
    pub hours: Vec<i64>,
    /// Weekdays present in the data, Monday first.
    pub weekdays: Vec<Weekday>,
    /// `counts[h][w]` for `hours[h]` and `weekdays[w]`; absent pairs are 0.
    pub counts: Vec<Vec<u64>>,
}

impl HourWeekdayMatrix {
    pub fn max_count(&self) -> u64 {
        self.counts.iter().flatten().copied().max().unwrap_or(0)
    }
}

/// `None` when no row has an hour, or no row has both an hour and a date.
pub fn hour_weekday_matrix(data: &NormalizedTable) -> Option<HourWeekdayMatrix> {
    let hours = data.table.column(HOUR)?;
    if hours.values.iter().all(CellValue::is_missing) {
        return None;
    }
    let dates = data.field(Field::TransactionDate)?;

    // Weekday is not Ord; key by days from Monday instead.
    let mut cells: BTreeMap<(i64, u32), u64> = BTreeMap::new();
    let mut present = [false; 7];
    for (hour, date) in hours.values.iter().zip(&dates.values) {
        let (CellValue::Integer(h), Some(d)) = (hour, date.as_date()) else {
            continue;
        };
        let day = d.weekday().num_days_from_monday();
        present[day as usize] = true;
        *cells.entry((*h, day)).or_insert(0) += 1;
    }
    if cells.is_empty() {
        return None;
    }

    let weekdays: Vec<Weekday> = WEEK
        .into_iter()
        .filter(|d| present[d.num_days_from_monday() as usize])
        .collect();
    let mut hour_list: Vec<i64> = cells.keys().map(|(h, _)| *h).collect();
    hour_list.dedup();

    let counts = hour_list
        .iter()
        .map(|h| {
            weekdays
                .iter()
                .map(|d| {
                    cells
                        .get(&(*h, d.num_days_from_monday()))
                        .copied()
                        .unwrap_or(0)
                })
                .collect()
        })
        .collect();

    Some(HourWeekdayMatrix {
        hours: hour_list,
        weekdays,
        counts,
    })
}

/// Add a `Weekday` name column when any row has an hour, which is when the
/// heatmap renders. Rows without a date get a missing weekday.
pub fn with_weekday_column(mut data: NormalizedTable) -> NormalizedTable {
    let has_hours = data
        .table
        .column(HOUR)
        .is_some_and(|col| col.values.iter().any(|v| !v.is_missing()));
    if !has_hours {
        return data;
    }

    let names: Vec<CellValue> = match data.field(Field::TransactionDate) {
        Some(col) => col
            .values
            .iter()
            .map(|v| match v.as_date() {
                Some(d) => CellValue::Text(weekday_name(d.weekday()).to_string()),
                None => CellValue::Null,
            })
            .collect(),
        None => vec![CellValue::Null; data.len()],
    };
    data.table.set_column(WEEKDAY, names);
    data
}

// ---------------------------------------------------------------------------
// Scatter and trendline
// ---------------------------------------------------------------------------

/// Numeric fields that can go on the scatter x axis against `Amount`.
pub fn scatter_candidates(data: &NormalizedTable) -> Vec<Field> {
    if !data.capabilities.has(Field::Amount) {
        return Vec::new();
    }
    [Field::RemainingBalance, Field::CustomerAge]
        .into_iter()
        .filter(|f| data.capabilities.has(*f))
        .collect()
}

/// Columns usable for color-by: those that are not numeric.
pub fn categorical_columns(data: &NormalizedTable) -> Vec<String> {
    data.table
        .column_names()
        .into_iter()
        .filter(|name| !data.table.is_numeric_column(name))
        .map(str::to_string)
        .collect()
}

/// One colored group of `(x, Amount)` points.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterGroup {
    /// Value of the color-by column, `Null` when ungrouped or missing.
    pub key: CellValue,
    pub points: Vec<[f64; 2]>,
}

/// `(x, Amount)` pairs where both are numeric, grouped by `color_by`.
pub fn scatter_series(
    data: &NormalizedTable,
    x: Field,
    color_by: Option<&str>,
) -> Option<Vec<ScatterGroup>> {
    let xs = data.field(x)?;
    let ys = data.field(Field::Amount)?;
    let colors = color_by.and_then(|name| data.table.column(name));

    let mut groups: BTreeMap<CellValue, Vec<[f64; 2]>> = BTreeMap::new();
    for row in 0..data.len() {
        let (Some(xv), Some(yv)) = (xs.values[row].as_f64(), ys.values[row].as_f64()) else {
            continue;
        };
        let key = match colors {
            Some(col) if !col.values[row].is_missing() => col.values[row].clone(),
            _ => CellValue::Null,
        };
        groups.entry(key).or_default().push([xv, yv]);
    }

    Some(
        groups
            .into_iter()
            .map(|(key, points)| ScatterGroup { key, points })
            .collect(),
    )
}

/// Ordinary least squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// `None` for fewer than two points or when every x is the same.
pub fn linear_fit<'a>(points: impl IntoIterator<Item = &'a [f64; 2]>) -> Option<LinearFit> {
    let points: Vec<&[f64; 2]> = points.into_iter().collect();
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p[0]).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p[1]).sum::<f64>() / n;

    let (sxy, sxx) = points.iter().fold((0.0f64, 0.0f64), |(sxy, sxx), p| {
        let dx = p[0] - mean_x;
        (sxy + dx * (p[1] - mean_y), sxx + dx * dx)
    });
    if sxx.abs() < f64::EPSILON {
        return None;
    }
    let slope = sxy / sxx;
    Some(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, TransactionTable};
    use crate::data::normalize::normalize;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn table(columns: Vec<Column>) -> NormalizedTable {
        normalize(TransactionTable::from_columns(columns))
    }

    #[test]
    fn summary_skips_missing_amounts() {
        let data = table(vec![Column::new(
            "Amount",
            vec![text("100"), text("abc"), text("300")],
        )]);
        let s = summary(&data);
        assert_eq!(s.rows, 3);
        let a = s.amount.unwrap();
        assert_eq!(a.count, 2);
        assert_eq!(a.sum, 400.0);
        assert_eq!(a.mean, Some(200.0));
        assert_eq!(a.median, Some(200.0));
    }

    #[test]
    fn summary_without_amount_column() {
        let data = table(vec![Column::new("City", vec![text("Pune")])]);
        assert_eq!(summary(&data).amount, None);
    }

    #[test]
    fn median_of_odd_count() {
        let data = table(vec![Column::new(
            "Amount",
            vec![CellValue::Integer(5), CellValue::Integer(1), CellValue::Integer(9)],
        )]);
        assert_eq!(summary(&data).amount.unwrap().median, Some(5.0));
    }

    #[test]
    fn monthly_trend_example() {
        let data = table(vec![
            Column::new("TransactionDate", vec![text("2024-02-20"), text("2024-01-15")]),
            Column::new("Amount", vec![CellValue::Integer(200), CellValue::Integer(100)]),
        ]);
        assert_eq!(
            monthly_trend(&data).unwrap(),
            vec![("2024-01".to_string(), 100.0), ("2024-02".to_string(), 200.0)]
        );
    }

    #[test]
    fn monthly_trend_total_matches_amount_sum() {
        let data = table(vec![
            Column::new(
                "TransactionDate",
                vec![text("2024-01-01"), text("2024-01-09"), text("2024-03-02"), text("2024-03-30")],
            ),
            Column::new("Amount", vec![text("10.5"), text("x"), text("4"), text("20")]),
        ]);
        let trend_total: f64 = monthly_trend(&data).unwrap().iter().map(|(_, v)| v).sum();
        assert_eq!(trend_total, summary(&data).amount.unwrap().sum);
    }

    #[test]
    fn undated_rows_form_a_trailing_group() {
        let data = table(vec![
            Column::new(
                "TransactionDate",
                vec![text("2024-01-15"), text("garbage"), text("2024-02-20")],
            ),
            Column::new(
                "Amount",
                vec![CellValue::Integer(100), CellValue::Integer(50), CellValue::Integer(200)],
            ),
        ]);
        let trend = monthly_trend(&data).unwrap();
        assert_eq!(
            trend,
            vec![
                ("2024-01".to_string(), 100.0),
                ("2024-02".to_string(), 200.0),
                (MISSING_MONTH.to_string(), 50.0),
            ]
        );
        let trend_total: f64 = trend.iter().map(|(_, v)| v).sum();
        assert_eq!(trend_total, summary(&data).amount.unwrap().sum);
    }

    #[test]
    fn unparseable_date_column_still_has_a_trend() {
        let data = table(vec![
            Column::new("TransactionDate", vec![text("soon"), text("later")]),
            Column::new("Amount", vec![CellValue::Integer(10), CellValue::Integer(20)]),
        ]);
        assert!(data.capabilities.has_month_grouping());
        let filtered = crate::data::filter::apply(&data, &Default::default());
        assert_eq!(filtered.len(), 2);
        assert_eq!(
            monthly_trend(&filtered).unwrap(),
            vec![(MISSING_MONTH.to_string(), 30.0)]
        );
    }

    #[test]
    fn monthly_trend_needs_dates() {
        let data = table(vec![Column::new("Amount", vec![CellValue::Integer(1)])]);
        assert!(monthly_trend(&data).is_none());
    }

    #[test]
    fn value_counts_example() {
        let data = table(vec![Column::new(
            "PaymentMethod",
            vec![text("UPI"), text("Card"), text("UPI")],
        )]);
        assert_eq!(
            value_counts(&data, Field::PaymentMethod).unwrap(),
            vec![(text("UPI"), 2), (text("Card"), 1)]
        );
        assert!(value_counts(&data, Field::Status).is_none());
    }

    #[test]
    fn top_merchants_are_capped_and_non_increasing() {
        let merchants: Vec<CellValue> = (0..15).map(|i| text(&format!("M{i:02}"))).collect();
        let amounts: Vec<CellValue> = (0..15).map(|i| CellValue::Integer((i % 7) * 10)).collect();
        let data = table(vec![
            Column::new("MerchantName", merchants),
            Column::new("Amount", amounts),
        ]);

        let top = top_by_amount(&data, Field::MerchantName, 10).unwrap();
        assert_eq!(top.len(), 10);
        assert!(top.windows(2).all(|w| w[0].1 >= w[1].1));
        assert_eq!(top[0], (text("M06"), 60.0));
        // Equal totals keep key order.
        assert_eq!(top[1], (text("M13"), 60.0));
    }

    #[test]
    fn heatmap_orders_weekdays_and_fills_zero() {
        // 2024-01-15 is a Monday, 2024-01-17 a Wednesday, 2024-01-21 a Sunday.
        let data = table(vec![
            Column::new(
                "TransactionDate",
                vec![text("2024-01-21"), text("2024-01-15"), text("2024-01-17"), text("2024-01-15")],
            ),
            Column::new(
                "TransactionTime",
                vec![text("09:00"), text("09:15"), text("18:30"), text("09:45")],
            ),
        ]);
        let m = hour_weekday_matrix(&data).unwrap();
        assert_eq!(m.weekdays, vec![Weekday::Mon, Weekday::Wed, Weekday::Sun]);
        assert_eq!(m.hours, vec![9, 18]);
        assert_eq!(m.counts, vec![vec![2, 0, 1], vec![0, 1, 0]]);
        assert_eq!(m.max_count(), 2);
    }

    #[test]
    fn weekday_names_follow_the_dates() {
        let data = with_weekday_column(table(vec![
            Column::new(
                "TransactionDate",
                vec![text("2024-01-15"), text("bad"), text("2024-01-21")],
            ),
            Column::new("TransactionTime", vec![text("09:00"), text("10:00"), text("11:00")]),
        ]));
        assert_eq!(
            data.table.column(WEEKDAY).unwrap().values,
            vec![text("Monday"), CellValue::Null, text("Sunday")]
        );
    }

    #[test]
    fn no_weekday_column_without_hours() {
        let data = with_weekday_column(table(vec![Column::new(
            "TransactionDate",
            vec![text("2024-01-15")],
        )]));
        assert!(!data.table.has_column(WEEKDAY));
    }

    #[test]
    fn heatmap_skipped_without_hours() {
        let data = table(vec![Column::new("TransactionDate", vec![text("2024-01-21")])]);
        assert!(hour_weekday_matrix(&data).is_none());
    }

    #[test]
    fn scatter_groups_by_color_column() {
        let data = table(vec![
            Column::new("Amount", vec![CellValue::Integer(10), CellValue::Integer(20), text("x")]),
            Column::new(
                "CustomerAge",
                vec![CellValue::Integer(30), CellValue::Integer(40), CellValue::Integer(50)],
            ),
            Column::new("Status", vec![text("OK"), text("FAIL"), text("OK")]),
        ]);
        assert_eq!(scatter_candidates(&data), vec![Field::CustomerAge]);
        // Derived YearMonth/Hour are all-missing here, which counts as numeric.
        assert_eq!(categorical_columns(&data), vec!["Status".to_string()]);

        let groups = scatter_series(&data, Field::CustomerAge, Some("Status")).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, text("FAIL"));
        assert_eq!(groups[0].points, vec![[40.0, 20.0]]);
        assert_eq!(groups[1].points, vec![[30.0, 10.0]]);
    }

    #[test]
    fn linear_fit_recovers_exact_line() {
        let points = [[0.0, 1.0], [1.0, 3.0], [2.0, 5.0], [3.0, 7.0]];
        let fit = linear_fit(&points).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.predict(10.0) - 21.0).abs() < 1e-9);
    }

    #[test]
    fn linear_fit_rejects_degenerate_input() {
        assert!(linear_fit(&[[1.0, 2.0]]).is_none());
        assert!(linear_fit(&[[1.0, 2.0], [1.0, 5.0]]).is_none());
    }
}
