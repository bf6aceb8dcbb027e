use std::path::Path;

use anyhow::{Context, Result};
use chrono::Timelike;
use rand::Rng;

use super::model::{CellValue, TransactionTable};

/// Default file name offered by the save dialog.
pub const EXPORT_FILE_NAME: &str = "filtered_upi_transactions.csv";

/// Serialize a table as UTF-8 CSV: every column (derived ones included),
/// header first, missing cells empty. A date-time column whose values all
/// fall on midnight is written as plain dates.
pub fn to_csv_bytes(table: &TransactionTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(table.column_names())
        .context("writing CSV header")?;

    let columns = table.columns();
    let dates_only: Vec<bool> = columns.iter().map(|c| is_midnight_only(&c.values)).collect();
    for row in 0..table.len() {
        let record = columns.iter().zip(&dates_only).map(|(c, &as_date)| {
            match &c.values[row] {
                CellValue::DateTime(dt) if as_date => dt.format("%Y-%m-%d").to_string(),
                cell => cell.to_export_string(),
            }
        });
        writer
            .write_record(record)
            .with_context(|| format!("writing CSV row {row}"))?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CSV buffer: {}", e.error()))
}

/// True when every present value is a date-time at exactly 00:00:00.
fn is_midnight_only(values: &[CellValue]) -> bool {
    let mut any = false;
    for value in values {
        match value {
            CellValue::DateTime(dt) => {
                if dt.num_seconds_from_midnight() != 0 || dt.nanosecond() != 0 {
                    return false;
                }
                any = true;
            }
            v if v.is_missing() => {}
            _ => return false,
        }
    }
    any
}

pub fn write_csv(table: &TransactionTable, path: &Path) -> Result<()> {
    let bytes = to_csv_bytes(table)?;
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    log::info!("Exported {} rows to {}", table.len(), path.display());
    Ok(())
}

/// Pick `min(n, len)` distinct row indices at random for the preview.
pub fn sample_indices<R: Rng + ?Sized>(len: usize, n: usize, rng: &mut R) -> Vec<usize> {
    rand::seq::index::sample(rng, len, n.min(len)).into_vec()
}
