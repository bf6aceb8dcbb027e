use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;

use crate::config::DashboardConfig;
use crate::data::aggregate::{scatter_candidates, with_weekday_column};
use crate::data::cache::{LoadCache, LoadOutcome};
use crate::data::export;
use crate::data::filter::{apply, DateRange, FilterCriteria, FilterOptions};
use crate::data::loader::DataSource;
use crate::data::model::CellValue;
use crate::data::normalize::{normalize, Field, NormalizedTable};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Scatter chart controls.
#[derive(Debug, Clone, Default)]
pub struct ScatterSettings {
    pub x: Option<Field>,
    pub color_by: Option<String>,
    pub trendline: bool,
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Memoized loads for the lifetime of the process.
    pub cache: LoadCache,

    /// Normalized dataset (None when nothing could be loaded).
    pub data: Option<NormalizedTable>,

    /// Filter choices derived from `data`.
    pub options: FilterOptions,

    /// Current filter selections.
    pub criteria: FilterCriteria,

    /// Rows of `data` passing the current filters (cached).
    pub filtered: Option<NormalizedTable>,

    /// Sampled row positions into `filtered` for the preview table.
    pub preview: Vec<usize>,

    pub scatter: ScatterSettings,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            cache: LoadCache::new(),
            data: None,
            options: FilterOptions::default(),
            criteria: FilterCriteria::default(),
            filtered: None,
            preview: Vec::new(),
            scatter: ScatterSettings::default(),
            status_message: None,
        }
    }

    /// Startup path: read the configured fallback file, if any.
    pub fn load_fallback(&mut self) {
        let source = DataSource::Path(self.config.fallback_path.clone());
        self.load(source);
    }

    /// Load a source through the cache and ingest the result.
    pub fn load(&mut self, source: DataSource) {
        match self.cache.load(&source) {
            LoadOutcome::Loaded(raw) => {
                self.set_dataset(normalize(raw.as_ref().clone()));
                self.status_message = None;
            }
            LoadOutcome::NoData => self.clear_dataset(),
            LoadOutcome::Failed(msg) => {
                self.clear_dataset();
                self.status_message = Some(msg);
            }
        }
    }

    /// Ingest a newly normalized dataset, initialise filters and controls.
    pub fn set_dataset(&mut self, data: NormalizedTable) {
        self.options = FilterOptions::derive(&data);
        self.criteria = FilterCriteria::defaults(&self.options, &self.config);
        self.scatter = ScatterSettings {
            x: scatter_candidates(&data).first().copied(),
            ..Default::default()
        };
        self.data = Some(data);
        self.refilter();
    }

    fn clear_dataset(&mut self) {
        self.data = None;
        self.filtered = None;
        self.preview.clear();
        self.options = FilterOptions::default();
        self.criteria = FilterCriteria::default();
    }

    /// Recompute the filtered table after a criteria change.
    pub fn refilter(&mut self) {
        self.filtered = self
            .data
            .as_ref()
            .map(|d| with_weekday_column(apply(d, &self.criteria)));
        self.resample_preview();
    }

    /// Draw a fresh random sample for the preview table.
    pub fn resample_preview(&mut self) {
        let len = self.filtered.as_ref().map_or(0, NormalizedTable::len);
        self.preview = export::sample_indices(len, self.config.preview_rows, &mut rand::thread_rng());
    }

    /// Toggle a single value in a field's selection.
    pub fn toggle_filter_value(&mut self, field: Field, value: &CellValue) {
        let selected = self.criteria.selections.entry(field).or_default();
        if !selected.remove(value) {
            selected.insert(value.clone());
        }
        self.refilter();
    }

    /// Select every offered value of a field.
    pub fn select_all(&mut self, field: Field) {
        let all: BTreeSet<CellValue> = self.options.values(field).iter().cloned().collect();
        self.criteria.selections.insert(field, all);
        self.refilter();
    }

    /// Clear a field's selection, which disables that filter.
    pub fn select_none(&mut self, field: Field) {
        self.criteria.selections.insert(field, BTreeSet::new());
        self.refilter();
    }

    pub fn set_date_range(&mut self, start: NaiveDate, end: NaiveDate) {
        self.criteria.date_range = DateRange::from_endpoints(&[start, end]);
        self.refilter();
    }

    pub fn set_amount_range(&mut self, lo: f64, hi: f64) {
        self.criteria.amount_range = Some((lo, hi));
        self.refilter();
    }

    /// Write the filtered table as CSV.
    pub fn export_filtered(&self, path: &Path) -> Result<()> {
        let filtered = self
            .filtered
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no data loaded"))?;
        export::write_csv(&filtered.table, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(body: &str) -> DataSource {
        DataSource::Upload {
            name: "upi.csv".into(),
            bytes: body.as_bytes().to_vec(),
        }
    }

    const BODY: &str = "TransactionDate,Amount,City,PaymentMethod,CustomerAge\n\
                        2024-01-15,100,Pune,UPI,30\n\
                        2024-02-20,200,Delhi,Card,41\n\
                        2024-03-02,300,Agra,UPI,25\n";

    fn loaded() -> AppState {
        let config = DashboardConfig {
            default_amount_fraction: 1.0,
            ..Default::default()
        };
        let mut state = AppState::new(config);
        state.load(upload(BODY));
        state
    }

    #[test]
    fn load_applies_defaults_and_filters() {
        let state = loaded();
        assert_eq!(state.data.as_ref().unwrap().len(), 3);
        assert_eq!(state.filtered.as_ref().unwrap().len(), 3);
        assert_eq!(state.preview.len(), 3);
        assert_eq!(state.scatter.x, Some(Field::CustomerAge));
    }

    #[test]
    fn toggling_and_clearing_a_selection() {
        let mut state = loaded();
        state.select_none(Field::City);
        state.toggle_filter_value(Field::City, &CellValue::Text("Pune".into()));
        assert_eq!(state.filtered.as_ref().unwrap().len(), 1);

        // Deselecting the last value empties the set, which means "all".
        state.toggle_filter_value(Field::City, &CellValue::Text("Pune".into()));
        assert_eq!(state.filtered.as_ref().unwrap().len(), 3);

        state.select_all(Field::City);
        assert_eq!(state.filtered.as_ref().unwrap().len(), 3);
    }

    #[test]
    fn options_survive_filtering() {
        let mut state = loaded();
        state.set_amount_range(150.0, 250.0);
        assert_eq!(state.filtered.as_ref().unwrap().len(), 1);
        assert_eq!(state.options.values(Field::City).len(), 3);
    }

    #[test]
    fn failed_upload_clears_data_and_reports() {
        let mut state = loaded();
        state.load(DataSource::Upload {
            name: "broken.xlsx".into(),
            bytes: Vec::new(),
        });
        assert!(state.data.is_none());
        assert!(state.status_message.is_some());
    }

    #[test]
    fn missing_fallback_halts_quietly() {
        let config = DashboardConfig {
            fallback_path: "/no/such/upi.csv".into(),
            ..Default::default()
        };
        let mut state = AppState::new(config);
        state.load_fallback();
        assert!(state.data.is_none());
        assert!(state.status_message.is_none());
    }

    #[test]
    fn export_writes_filtered_rows() {
        let mut state = loaded();
        state.set_date_range(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        state.export_filtered(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
