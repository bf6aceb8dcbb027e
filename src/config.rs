use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Optional settings file looked up in the working directory.
pub const CONFIG_FILE: &str = "upi_dashboard.json";

// ---------------------------------------------------------------------------
// Dashboard configuration
// ---------------------------------------------------------------------------

/// Tunables for the dashboard. Every field has a default, so a partial JSON
/// file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Dataset read at startup when nothing has been uploaded.
    pub fallback_path: PathBuf,
    /// Maximum rows in the sampled preview table.
    pub preview_rows: usize,
    /// How many merchants the top-merchants chart shows.
    pub top_merchants: usize,
    /// Cities pre-selected when a dataset is first shown.
    pub default_city_count: usize,
    /// Initial amount filter covers `[min, min + (max - min) * fraction]`.
    pub default_amount_fraction: f64,
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            fallback_path: PathBuf::from("filtered_upi_transactions.csv"),
            preview_rows: 200,
            top_merchants: 10,
            default_city_count: 5,
            default_amount_fraction: 0.1,
            window_width: 1280.0,
            window_height: 900.0,
        }
    }
}

impl DashboardConfig {
    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Load `upi_dashboard.json` if it exists; fall back to defaults on any
    /// problem.
    pub fn load_or_default() -> Self {
        let path = Path::new(CONFIG_FILE);
        if !path.exists() {
            return Self::default();
        }
        match Self::from_file(path) {
            Ok(cfg) => {
                log::info!("Using configuration from {CONFIG_FILE}");
                cfg
            }
            Err(e) => {
                log::warn!("Ignoring {CONFIG_FILE}: {e:#}");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{ "preview_rows": 50, "fallback_path": "data/upi.xlsx" }"#)
            .unwrap();

        let cfg = DashboardConfig::from_file(&path).unwrap();
        assert_eq!(cfg.preview_rows, 50);
        assert_eq!(cfg.fallback_path, PathBuf::from("data/upi.xlsx"));
        assert_eq!(cfg.top_merchants, 10);
        assert_eq!(cfg.default_city_count, 5);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{ not json").unwrap();
        let err = DashboardConfig::from_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parsing"));
    }
}
