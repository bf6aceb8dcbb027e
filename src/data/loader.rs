use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    TimeUnit, TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use calamine::{open_workbook_auto_from_rs, Data, DataType as _, Reader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::{CellValue, Column, TransactionTable};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("workbook has no worksheets")]
    NoSheet,
    #[error("invalid JSON layout: {0}")]
    InvalidJson(String),
    #[error("no columns to parse from file")]
    Empty,
}

pub type Result<T> = std::result::Result<T, LoadError>;

// ---------------------------------------------------------------------------
// Data sources
// ---------------------------------------------------------------------------

/// Where a dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// A user-picked file, already read into memory.
    Upload { name: String, bytes: Vec<u8> },
    /// A file read from disk at startup.
    Path(PathBuf),
}

impl DataSource {
    /// Read a picked file into an upload handle.
    pub fn upload_from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(DataSource::Upload { name, bytes })
    }

    /// Short label for status messages.
    pub fn label(&self) -> String {
        match self {
            DataSource::Upload { name, .. } => name.clone(),
            DataSource::Path(p) => p.display().to_string(),
        }
    }
}

/// Parser family chosen from a file name's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Spreadsheet,
    Parquet,
    Json,
    Delimited,
}

impl FileFormat {
    pub fn from_name(name: &str) -> Self {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => FileFormat::Spreadsheet,
            "parquet" | "pq" => FileFormat::Parquet,
            "json" => FileFormat::Json,
            _ => FileFormat::Delimited,
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Parse an uploaded file. Dispatch by extension; when a non-delimited parser
/// fails, rewind and retry the same bytes as delimited text.
pub fn load_upload(name: &str, bytes: &[u8]) -> Result<TransactionTable> {
    let mut cursor = Cursor::new(bytes);
    let format = FileFormat::from_name(name);

    let first = parse(format, &mut cursor);
    match first {
        Ok(table) => Ok(table),
        Err(e) if format != FileFormat::Delimited => {
            log::warn!("{name}: {format:?} parser failed ({e}), retrying as delimited text");
            cursor.rewind()?;
            load_delimited(cursor)
        }
        Err(e) => Err(e),
    }
}

/// Read and parse a file on disk, dispatching by extension.
pub fn load_path(path: &Path) -> Result<TransactionTable> {
    let bytes = std::fs::read(path)?;
    let name = path.to_string_lossy();
    parse(FileFormat::from_name(&name), &mut Cursor::new(bytes.as_slice()))
}

fn parse(format: FileFormat, cursor: &mut Cursor<&[u8]>) -> Result<TransactionTable> {
    match format {
        FileFormat::Spreadsheet => load_spreadsheet(cursor.clone()),
        FileFormat::Parquet => load_parquet(cursor.get_ref()),
        FileFormat::Json => load_json(cursor.get_ref()),
        FileFormat::Delimited => load_delimited(cursor.by_ref()),
    }
}

// ---------------------------------------------------------------------------
// Delimited text loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one transaction per record.
/// Cell types are guessed per cell; the normalizer coerces known columns.
fn load_delimited<R: Read>(reader: R) -> Result<TransactionTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.is_empty() {
        return Err(LoadError::Empty);
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(guess_cell_type).collect());
    }

    Ok(TransactionTable::from_rows(headers, rows))
}

fn guess_cell_type(s: &str) -> CellValue {
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    match s {
        "true" | "True" | "TRUE" => CellValue::Bool(true),
        "false" | "False" | "FALSE" => CellValue::Bool(false),
        _ => CellValue::Text(s.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Spreadsheet loader
// ---------------------------------------------------------------------------

/// First worksheet, first row is the header.
fn load_spreadsheet<RS: Read + Seek + Clone>(reader: RS) -> Result<TransactionTable> {
    let mut workbook = open_workbook_auto_from_rs(reader)?;
    let range = workbook.worksheet_range_at(0).ok_or(LoadError::NoSheet)??;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Err(LoadError::Empty);
    };
    let headers: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell.as_string() {
            Some(s) if !s.trim().is_empty() => s,
            _ => format!("column_{}", i + 1),
        })
        .collect();

    let body = rows
        .map(|row| row.iter().map(spreadsheet_cell).collect())
        .collect();

    Ok(TransactionTable::from_rows(headers, body))
}

fn spreadsheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) if s.is_empty() => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or(CellValue::Null),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Null,
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "TransactionDate": "2024-01-15", "Amount": 100.0, "City": "Pune" },
///   ...
/// ]
/// ```
fn load_json(bytes: &[u8]) -> Result<TransactionTable> {
    let root: JsonValue = serde_json::from_slice(bytes)?;
    let records = root
        .as_array()
        .ok_or_else(|| LoadError::InvalidJson("expected top-level array".into()))?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| LoadError::InvalidJson(format!("row {i} is not an object")))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }
    if headers.is_empty() {
        return Err(LoadError::Empty);
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map(json_to_cell).unwrap_or(CellValue::Null))
                .collect()
        })
        .collect();

    Ok(TransactionTable::from_rows(headers, rows))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file; every column becomes a table column.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(bytes: &[u8]) -> Result<TransactionTable> {
    let data = bytes::Bytes::copy_from_slice(bytes);
    let builder = ParquetRecordBatchReaderBuilder::try_new(data)?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    if headers.is_empty() {
        return Err(LoadError::Empty);
    }
    let reader = builder.build()?;

    let mut columns: Vec<Column> = headers
        .iter()
        .map(|h| Column::new(h.clone(), Vec::new()))
        .collect();

    for batch_result in reader {
        let batch = batch_result?;
        for (col, array) in columns.iter_mut().zip(batch.columns()) {
            for row in 0..batch.num_rows() {
                col.values.push(arrow_cell(array, row)?);
            }
        }
    }

    Ok(TransactionTable::from_columns(columns))
}

/// Extract a single cell from an Arrow column at a given row.
fn arrow_cell(col: &ArrayRef, row: usize) -> Result<CellValue> {
    if col.is_null(row) {
        return Ok(CellValue::Null);
    }
    let value = match col.data_type() {
        DataType::Utf8 => CellValue::Text(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => CellValue::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int8 => CellValue::Integer(col.as_primitive::<Int8Type>().value(row).into()),
        DataType::Int16 => CellValue::Integer(col.as_primitive::<Int16Type>().value(row).into()),
        DataType::Int32 => CellValue::Integer(col.as_primitive::<Int32Type>().value(row).into()),
        DataType::Int64 => CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => CellValue::Integer(col.as_primitive::<UInt8Type>().value(row).into()),
        DataType::UInt16 => CellValue::Integer(col.as_primitive::<UInt16Type>().value(row).into()),
        DataType::UInt32 => CellValue::Integer(col.as_primitive::<UInt32Type>().value(row).into()),
        DataType::UInt64 => {
            let v = col.as_primitive::<UInt64Type>().value(row);
            i64::try_from(v)
                .map(CellValue::Integer)
                .unwrap_or(CellValue::Float(v as f64))
        }
        DataType::Float32 => CellValue::Float(col.as_primitive::<Float32Type>().value(row).into()),
        DataType::Float64 => CellValue::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => CellValue::Bool(col.as_boolean().value(row)),
        DataType::Date32 => col
            .as_primitive::<Date32Type>()
            .value_as_date(row)
            .map(CellValue::Date)
            .unwrap_or(CellValue::Null),
        DataType::Timestamp(unit, _) => {
            let dt = match unit {
                TimeUnit::Second => col.as_primitive::<TimestampSecondType>().value_as_datetime(row),
                TimeUnit::Millisecond => col
                    .as_primitive::<TimestampMillisecondType>()
                    .value_as_datetime(row),
                TimeUnit::Microsecond => col
                    .as_primitive::<TimestampMicrosecondType>()
                    .value_as_datetime(row),
                TimeUnit::Nanosecond => col
                    .as_primitive::<TimestampNanosecondType>()
                    .value_as_datetime(row),
            };
            dt.map(CellValue::DateTime).unwrap_or(CellValue::Null)
        }
        _ => {
            let formatter = ArrayFormatter::try_new(col.as_ref(), &FormatOptions::default())?;
            CellValue::Text(formatter.value(row).to_string())
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn format_is_chosen_by_extension() {
        assert_eq!(FileFormat::from_name("UPI+Transactions.XLSX"), FileFormat::Spreadsheet);
        assert_eq!(FileFormat::from_name("old.xls"), FileFormat::Spreadsheet);
        assert_eq!(FileFormat::from_name("t.parquet"), FileFormat::Parquet);
        assert_eq!(FileFormat::from_name("t.json"), FileFormat::Json);
        assert_eq!(FileFormat::from_name("t.csv"), FileFormat::Delimited);
        assert_eq!(FileFormat::from_name("no_extension"), FileFormat::Delimited);
    }

    #[test]
    fn delimited_cells_are_typed() {
        let csv = b"Amount,City,Flag\n100,Pune,true\n12.5,,false\n";
        let table = load_upload("t.csv", csv).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.column("Amount").unwrap().values,
            vec![CellValue::Integer(100), CellValue::Float(12.5)]
        );
        assert_eq!(
            table.column("City").unwrap().values,
            vec![CellValue::Text("Pune".into()), CellValue::Null]
        );
        assert_eq!(table.column("Flag").unwrap().values[0], CellValue::Bool(true));
    }

    #[test]
    fn csv_named_xlsx_is_retried_as_delimited() {
        let csv = b"Amount,City\n100,Pune\n";
        let table = load_upload("mislabelled.xlsx", csv).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.has_column("City"));
    }

    #[test]
    fn empty_upload_is_an_error() {
        assert!(load_upload("empty.csv", b"").is_err());
        assert!(load_upload("empty.xlsx", b"").is_err());
    }

    #[test]
    fn json_records_union_keys() {
        let json = br#"[{"Amount": 5, "City": "Pune"}, {"Amount": 7.5, "Status": "SUCCESS"}]"#;
        let table = load_upload("t.json", json).unwrap();
        assert_eq!(table.column_names(), vec!["Amount", "City", "Status"]);
        assert_eq!(table.column("Status").unwrap().values[0], CellValue::Null);
        assert_eq!(table.column("Amount").unwrap().values[1], CellValue::Float(7.5));
    }

    #[test]
    fn load_path_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, " Amount ,City").unwrap();
        writeln!(f, "300,Delhi").unwrap();
        drop(f);

        let table = load_path(&path).unwrap();
        assert_eq!(table.len(), 1);
        // Names are trimmed later by the normalizer, not by the loader.
        assert!(table.has_column(" Amount "));
    }

    #[test]
    fn missing_path_is_an_io_error() {
        let err = load_path(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
