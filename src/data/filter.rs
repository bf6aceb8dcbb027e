use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use super::model::CellValue;
use super::normalize::{Field, NormalizedTable};
use crate::config::DashboardConfig;

/// Fields offered as multi-select filters, in sidebar order.
pub const CATEGORICAL_FILTERS: [Field; 3] = [Field::City, Field::PaymentMethod, Field::Status];

// ---------------------------------------------------------------------------
// Filter criteria
// ---------------------------------------------------------------------------

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// A range only exists when exactly two endpoints were picked.
    pub fn from_endpoints(endpoints: &[NaiveDate]) -> Option<Self> {
        match endpoints {
            [start, end] => Some(Self {
                start: *start,
                end: *end,
            }),
            _ => None,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Per-field selection state: maps field → set of selected values.
/// If a field is absent or its set is empty, it means "no filter" (show all).
pub type Selections = BTreeMap<Field, BTreeSet<CellValue>>;

/// Everything the user picked in the sidebar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub date_range: Option<DateRange>,
    pub selections: Selections,
    /// Inclusive `[min, max]` on `Amount`.
    pub amount_range: Option<(f64, f64)>,
}

impl FilterCriteria {
    /// Deterministic first-presentation defaults: full date range, the first
    /// few cities, every payment method and status, and the low end of the
    /// amount range.
    pub fn defaults(options: &FilterOptions, config: &DashboardConfig) -> Self {
        let mut selections = Selections::new();
        for (field, values) in &options.categories {
            let chosen: BTreeSet<CellValue> = match field {
                Field::City => values.iter().take(config.default_city_count).cloned().collect(),
                _ => values.iter().cloned().collect(),
            };
            selections.insert(*field, chosen);
        }

        let amount_range = options.amount_bounds.map(|(lo, hi)| {
            let fraction = config.default_amount_fraction.clamp(0.0, 1.0);
            (lo, (lo + (hi - lo) * fraction).min(hi))
        });

        Self {
            date_range: options.date_bounds,
            selections,
            amount_range,
        }
    }

    /// Selected values for a field (empty when nothing is selected).
    pub fn selected(&self, field: Field) -> Option<&BTreeSet<CellValue>> {
        self.selections.get(&field)
    }
}

// ---------------------------------------------------------------------------
// Filter options
// ---------------------------------------------------------------------------

/// Choices offered to the user, always derived from the unfiltered
/// normalized table so filters never narrow each other's lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    pub date_bounds: Option<DateRange>,
    /// Sorted distinct non-missing values per categorical field.
    pub categories: BTreeMap<Field, Vec<CellValue>>,
    pub amount_bounds: Option<(f64, f64)>,
}

impl FilterOptions {
    pub fn derive(data: &NormalizedTable) -> Self {
        let date_bounds = data.field(Field::TransactionDate).and_then(|col| {
            let mut dates = col.values.iter().filter_map(CellValue::as_date);
            let first = dates.next()?;
            let (lo, hi) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
            Some(DateRange { start: lo, end: hi })
        });

        let categories = CATEGORICAL_FILTERS
            .into_iter()
            .filter_map(|field| {
                let col = data.field(field)?;
                Some((field, col.distinct_values().into_iter().collect()))
            })
            .collect();

        let amount_bounds = data.field(Field::Amount).and_then(|col| {
            col.values
                .iter()
                .filter_map(CellValue::as_f64)
                .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                    None => Some((v, v)),
                    Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                })
        });

        Self {
            date_bounds,
            categories,
            amount_bounds,
        }
    }

    pub fn values(&self, field: Field) -> &[CellValue] {
        self.categories.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Return indices of rows that pass all active filters.
///
/// A row passes when:
/// * the date range is unset or the field is absent, or its date lies in the
///   inclusive range (missing dates fail an active range);
/// * for each categorical field, the selection is empty (no constraint) or
///   the field is absent, or the row's value is selected;
/// * the amount range is unset or the field is absent, or its amount lies in
///   the inclusive range (missing amounts fail an active range).
pub fn filtered_indices(data: &NormalizedTable, criteria: &FilterCriteria) -> Vec<usize> {
    let dates = criteria
        .date_range
        .and_then(|range| Some((range, data.field(Field::TransactionDate)?)));

    let memberships: Vec<_> = criteria
        .selections
        .iter()
        .filter(|(_, selected)| !selected.is_empty())
        .filter_map(|(field, selected)| Some((data.field(*field)?, selected)))
        .collect();

    let amounts = criteria
        .amount_range
        .and_then(|range| Some((range, data.field(Field::Amount)?)));

    (0..data.len())
        .filter(|&row| {
            if let Some((range, col)) = &dates {
                match col.values[row].as_date() {
                    Some(d) if range.contains(d) => {}
                    _ => return false,
                }
            }
            for (col, selected) in &memberships {
                let value = &col.values[row];
                if value.is_missing() || !selected.contains(value) {
                    return false;
                }
            }
            if let Some(((lo, hi), col)) = &amounts {
                match col.values[row].as_f64() {
                    Some(a) if *lo <= a && a <= *hi => {}
                    _ => return false,
                }
            }
            true
        })
        .collect()
}

/// The filtered table: a row subset of `data`, never a mutation of it.
pub fn apply(data: &NormalizedTable, criteria: &FilterCriteria) -> NormalizedTable {
    let indices = filtered_indices(data, criteria);
    log::debug!("filter kept {} of {} rows", indices.len(), data.len());
    data.take(&indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, TransactionTable};
    use crate::data::normalize::normalize;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> NormalizedTable {
        normalize(TransactionTable::from_columns(vec![
            Column::new(
                "TransactionDate",
                vec![text("2024-01-15"), text("2024-02-20"), text("2024-01-31"), text("bad")],
            ),
            Column::new("Amount", vec![text("100"), text("200"), text("50"), text("75")]),
            Column::new("City", vec![text("Pune"), text("Delhi"), text("Pune"), CellValue::Null]),
            Column::new(
                "PaymentMethod",
                vec![text("UPI"), text("Card"), text("UPI"), text("UPI")],
            ),
        ]))
    }

    fn criteria_with(field: Field, values: &[&str]) -> FilterCriteria {
        let mut c = FilterCriteria::default();
        c.selections.insert(field, values.iter().map(|v| text(v)).collect());
        c
    }

    #[test]
    fn date_range_keeps_january_rows_inclusive() {
        let data = sample();
        let criteria = FilterCriteria {
            date_range: DateRange::from_endpoints(&[date(2024, 1, 1), date(2024, 1, 31)]),
            ..Default::default()
        };
        assert_eq!(filtered_indices(&data, &criteria), vec![0, 2]);
    }

    #[test]
    fn date_range_needs_exactly_two_endpoints() {
        assert!(DateRange::from_endpoints(&[date(2024, 1, 1)]).is_none());
        assert!(DateRange::from_endpoints(&[]).is_none());
        assert!(
            DateRange::from_endpoints(&[date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)])
                .is_none()
        );
    }

    #[test]
    fn empty_selection_keeps_every_row() {
        let data = sample();
        let unfiltered = filtered_indices(&data, &FilterCriteria::default());
        let empty = filtered_indices(&data, &criteria_with(Field::City, &[]));
        assert_eq!(unfiltered, (0..data.len()).collect::<Vec<_>>());
        assert_eq!(empty, unfiltered);
    }

    #[test]
    fn membership_filter_drops_missing_and_unselected() {
        let data = sample();
        assert_eq!(filtered_indices(&data, &criteria_with(Field::City, &["Pune"])), vec![0, 2]);
    }

    #[test]
    fn extra_categorical_filter_never_grows_the_result() {
        let data = sample();
        let mut c = criteria_with(Field::PaymentMethod, &["UPI"]);
        let before = filtered_indices(&data, &c).len();
        c.selections.insert(Field::City, [text("Delhi")].into());
        let after = filtered_indices(&data, &c).len();
        assert!(after <= before);
        assert!(before <= data.len());
    }

    #[test]
    fn selection_on_absent_field_is_ignored() {
        let data = sample();
        let kept = filtered_indices(&data, &criteria_with(Field::Status, &["SUCCESS"]));
        assert_eq!(kept.len(), data.len());
    }

    #[test]
    fn amount_range_is_inclusive_on_both_ends() {
        let data = sample();
        let criteria = FilterCriteria {
            amount_range: Some((50.0, 100.0)),
            ..Default::default()
        };
        assert_eq!(filtered_indices(&data, &criteria), vec![0, 2, 3]);
    }

    #[test]
    fn apply_returns_a_row_subset() {
        let data = sample();
        let filtered = apply(&data, &criteria_with(Field::PaymentMethod, &["Card"]));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.field(Field::Amount).unwrap().values, vec![CellValue::Float(200.0)]);
        assert_eq!(filtered.capabilities, data.capabilities);
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn options_come_from_the_unfiltered_table() {
        let data = sample();
        let options = FilterOptions::derive(&data);
        assert_eq!(options.values(Field::City), &[text("Delhi"), text("Pune")]);
        assert_eq!(options.values(Field::PaymentMethod), &[text("Card"), text("UPI")]);
        assert!(options.values(Field::Status).is_empty());
        assert_eq!(
            options.date_bounds,
            Some(DateRange {
                start: date(2024, 1, 15),
                end: date(2024, 2, 20)
            })
        );
        assert_eq!(options.amount_bounds, Some((50.0, 200.0)));
    }

    #[test]
    fn defaults_are_deterministic() {
        let data = sample();
        let options = FilterOptions::derive(&data);
        let config = DashboardConfig {
            default_city_count: 1,
            default_amount_fraction: 0.5,
            ..Default::default()
        };
        let a = FilterCriteria::defaults(&options, &config);
        let b = FilterCriteria::defaults(&options, &config);
        assert_eq!(a, b);
        assert_eq!(a.selected(Field::City).unwrap().len(), 1);
        assert!(a.selected(Field::City).unwrap().contains(&text("Delhi")));
        assert_eq!(a.selected(Field::PaymentMethod).unwrap().len(), 2);
        assert_eq!(a.amount_range, Some((50.0, 125.0)));
    }
}
