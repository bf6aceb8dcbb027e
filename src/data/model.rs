use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

// ---------------------------------------------------------------------------
// CellValue – a single cell in a transaction column
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value covering what CSV, spreadsheets and
/// Parquet files hand us.
/// Filter selections live in `BTreeSet`s so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn rank(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
                Date(_) => 5,
                DateTime(_) => 6,
                Time(_) => 7,
            }
        }
        let ra = rank(self);
        let rb = rank(other);
        if ra != rb {
            return ra.cmp(&rb);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            (Time(a), Time(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Text(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Date(d) => d.hash(state),
            CellValue::DateTime(dt) => dt.hash(state),
            CellValue::Time(t) => t.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v:.2}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// `Null` and NaN floats are both "missing".
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Numeric view used by amount aggregation and scatter plots.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) if !v.is_nan() => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Calendar date of a date or date-time cell.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::DateTime(dt) => Some(dt.date()),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, CellValue::Integer(_) | CellValue::Float(_))
    }

    /// Canonical text for CSV export: full precision, empty for missing.
    pub fn to_export_string(&self) -> String {
        match self {
            v if v.is_missing() => String::new(),
            CellValue::Float(v) => v.to_string(),
            other => other.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Column / TransactionTable – the column-oriented record set
// ---------------------------------------------------------------------------

/// One named column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<CellValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Sorted set of distinct non-missing values.
    pub fn distinct_values(&self) -> BTreeSet<CellValue> {
        self.values
            .iter()
            .filter(|v| !v.is_missing())
            .cloned()
            .collect()
    }
}

/// A loaded transaction dataset. Every column holds exactly `len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionTable {
    columns: Vec<Column>,
    n_rows: usize,
}

impl TransactionTable {
    /// Build a table from columns, padding short columns with `Null`.
    pub fn from_columns(mut columns: Vec<Column>) -> Self {
        let n_rows = columns.iter().map(|c| c.values.len()).max().unwrap_or(0);
        for col in &mut columns {
            col.values.resize(n_rows, CellValue::Null);
        }
        Self { columns, n_rows }
    }

    /// Build a table from a header row and row-oriented records.
    /// Ragged rows are padded with `Null`; extra cells are dropped.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|h| Column::new(h, Vec::with_capacity(rows.len())))
            .collect();
        for row in rows {
            let mut cells = row.into_iter();
            for col in &mut columns {
                col.values.push(cells.next().unwrap_or(CellValue::Null));
            }
        }
        Self::from_columns(columns)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.n_rows
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Exact-match column lookup.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Trim leading/trailing whitespace from every column name.
    pub fn trim_column_names(&mut self) {
        for col in &mut self.columns {
            let trimmed = col.name.trim();
            if trimmed.len() != col.name.len() {
                col.name = trimmed.to_string();
            }
        }
    }

    /// Replace the named column's values, or append a new column.
    pub fn set_column(&mut self, name: &str, mut values: Vec<CellValue>) {
        values.resize(self.n_rows, CellValue::Null);
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(col) => col.values = values,
            None => self.columns.push(Column::new(name, values)),
        }
    }

    /// New table holding the given rows, in the given order.
    pub fn take(&self, indices: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|col| {
                let values = indices
                    .iter()
                    .filter_map(|&i| col.values.get(i).cloned())
                    .collect();
                Column::new(col.name.clone(), values)
            })
            .collect();
        Self {
            columns,
            n_rows: indices.iter().filter(|&&i| i < self.n_rows).count(),
        }
    }

    /// A column is numeric when every non-missing cell is an integer or float.
    /// All-missing columns count as numeric.
    pub fn is_numeric_column(&self, name: &str) -> bool {
        self.column(name).is_some_and(|col| {
            col.values
                .iter()
                .filter(|v| !v.is_missing())
                .all(CellValue::is_numeric)
        })
    }
}
