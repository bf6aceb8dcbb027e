use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use super::model::{CellValue, Column, TransactionTable};

/// Derived calendar month label, e.g. `2024-03`.
pub const YEAR_MONTH: &str = "YearMonth";
/// Derived date-only view of `TransactionDate`.
pub const DATE_ONLY: &str = "DateOnly";
/// Derived time of day parsed from `TransactionTime`.
pub const TIME_PARSED: &str = "TransactionTime_parsed";
/// Derived hour of day (0–23) from `TransactionTime`.
pub const HOUR: &str = "Hour";
/// Weekday name attached to a filtered table for the hour × weekday view.
pub const WEEKDAY: &str = "Weekday";

// ---------------------------------------------------------------------------
// Recognized fields and the capability descriptor
// ---------------------------------------------------------------------------

/// Columns the dashboard knows how to use. All of them are optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    TransactionDate,
    TransactionTime,
    Amount,
    City,
    PaymentMethod,
    Status,
    MerchantName,
    TransactionType,
    BankNameSent,
    RemainingBalance,
    CustomerAge,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::TransactionDate,
        Field::TransactionTime,
        Field::Amount,
        Field::City,
        Field::PaymentMethod,
        Field::Status,
        Field::MerchantName,
        Field::TransactionType,
        Field::BankNameSent,
        Field::RemainingBalance,
        Field::CustomerAge,
    ];

    /// Column header as it appears in the input file (after trimming).
    pub fn name(self) -> &'static str {
        match self {
            Field::TransactionDate => "TransactionDate",
            Field::TransactionTime => "TransactionTime",
            Field::Amount => "Amount",
            Field::City => "City",
            Field::PaymentMethod => "PaymentMethod",
            Field::Status => "Status",
            Field::MerchantName => "MerchantName",
            Field::TransactionType => "TransactionType",
            Field::BankNameSent => "BankNameSent",
            Field::RemainingBalance => "RemainingBalance",
            Field::CustomerAge => "CustomerAge",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which recognized fields a normalized table carries. Every feature that
/// depends on an optional column checks here instead of probing the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    present: BTreeSet<Field>,
}

impl Capabilities {
    pub fn detect(table: &TransactionTable) -> Self {
        let present = Field::ALL
            .into_iter()
            .filter(|f| table.has_column(f.name()))
            .collect();
        Self { present }
    }

    pub fn has(&self, field: Field) -> bool {
        self.present.contains(&field)
    }

    /// Month grouping needs a `TransactionDate` column. Whether any of its
    /// cells parse does not matter.
    pub fn has_month_grouping(&self) -> bool {
        self.has(Field::TransactionDate)
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.present.iter().copied()
    }
}

// ---------------------------------------------------------------------------
// NormalizedTable
// ---------------------------------------------------------------------------

/// A transaction table after name trimming and type coercion, together with
/// its capability descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    pub table: TransactionTable,
    pub capabilities: Capabilities,
}

impl NormalizedTable {
    /// Column of a recognized field, if the capability is present.
    pub fn field(&self, field: Field) -> Option<&Column> {
        if !self.capabilities.has(field) {
            return None;
        }
        self.table.column(field.name())
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Row subset sharing this table's capabilities.
    pub fn take(&self, indices: &[usize]) -> Self {
        Self {
            table: self.table.take(indices),
            capabilities: self.capabilities.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Trim column names, coerce known columns, add derived columns.
/// Running it on an already normalized table is a no-op.
pub fn normalize(mut table: TransactionTable) -> NormalizedTable {
    // Must happen before any lookup by name.
    table.trim_column_names();
    let capabilities = Capabilities::detect(&table);
    let n = table.len();

    if let Some(col) = table.column(Field::TransactionDate.name()) {
        let parsed: Vec<Option<NaiveDateTime>> = col.values.iter().map(parse_datetime).collect();
        let year_month = parsed
            .iter()
            .map(|dt| match dt {
                Some(dt) => CellValue::Text(dt.format("%Y-%m").to_string()),
                None => CellValue::Null,
            })
            .collect();
        let date_only = parsed
            .iter()
            .map(|dt| dt.map(|d| CellValue::Date(d.date())).unwrap_or(CellValue::Null))
            .collect();
        let dates = parsed
            .into_iter()
            .map(|dt| dt.map(CellValue::DateTime).unwrap_or(CellValue::Null))
            .collect();

        table.set_column(Field::TransactionDate.name(), dates);
        table.set_column(YEAR_MONTH, year_month);
        table.set_column(DATE_ONLY, date_only);
    } else {
        table.set_column(YEAR_MONTH, vec![CellValue::Null; n]);
    }

    let times: Option<Vec<Option<NaiveTime>>> = table
        .column(Field::TransactionTime.name())
        .map(|col| col.values.iter().map(parse_time).collect());
    let hours = match times {
        Some(times) => {
            let hours: Vec<CellValue> = times
                .iter()
                .map(|t| match t {
                    Some(t) => CellValue::Integer(i64::from(t.hour())),
                    None => CellValue::Null,
                })
                .collect();
            let parsed = times
                .into_iter()
                .map(|t| t.map(CellValue::Time).unwrap_or(CellValue::Null))
                .collect();
            table.set_column(TIME_PARSED, parsed);
            hours
        }
        None => vec![CellValue::Null; n],
    };
    table.set_column(HOUR, hours);

    if let Some(col) = table.column(Field::Amount.name()) {
        let amounts = col.values.iter().map(coerce_numeric).collect();
        table.set_column(Field::Amount.name(), amounts);
    }

    log::debug!(
        "normalized {n} rows, capabilities: {:?}",
        capabilities.fields().collect::<Vec<_>>()
    );

    NormalizedTable {
        table,
        capabilities,
    }
}

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
];

// Month-first before day-first, so 03/04/2024 is March 4th.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d %b %Y",
    "%b %d, %Y",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M", "%I:%M:%S %p", "%I:%M %p"];

/// Parse a cell to a date-time. Anything unparseable is `None`.
pub fn parse_datetime(cell: &CellValue) -> Option<NaiveDateTime> {
    match cell {
        CellValue::DateTime(dt) => Some(*dt),
        CellValue::Date(d) => d.and_hms_opt(0, 0, 0),
        CellValue::Text(s) => parse_datetime_str(s),
        _ => None,
    }
}

fn parse_datetime_str(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local())
}

/// Parse a cell to a time of day. Full date-times yield their time part.
pub fn parse_time(cell: &CellValue) -> Option<NaiveTime> {
    match cell {
        CellValue::Time(t) => Some(*t),
        CellValue::DateTime(dt) => Some(dt.time()),
        CellValue::Date(_) => NaiveTime::from_hms_opt(0, 0, 0),
        CellValue::Text(s) => {
            let s = s.trim();
            TIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
                .or_else(|| parse_datetime_str(s).map(|dt| dt.time()))
        }
        _ => None,
    }
}

/// Numeric coercion: numbers pass through, text is parsed, the rest is missing.
pub fn coerce_numeric(cell: &CellValue) -> CellValue {
    match cell {
        CellValue::Integer(i) => CellValue::Integer(*i),
        CellValue::Float(f) if f.is_finite() => CellValue::Float(*f),
        CellValue::Bool(b) => CellValue::Integer(i64::from(*b)),
        CellValue::Text(s) => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => CellValue::Float(f),
            _ => CellValue::Null,
        },
        _ => CellValue::Null,
    }
}
