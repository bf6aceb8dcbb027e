use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;

use super::loader::{self, DataSource};
use super::model::TransactionTable;

// ---------------------------------------------------------------------------
// Load outcome
// ---------------------------------------------------------------------------

/// Result of a load attempt. Loading never fails hard: every error becomes
/// `NoData` (fallback path) or `Failed` with a message (upload).
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Loaded(Arc<TransactionTable>),
    NoData,
    Failed(String),
}

impl LoadOutcome {
    pub fn table(&self) -> Option<&Arc<TransactionTable>> {
        match self {
            LoadOutcome::Loaded(t) => Some(t),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Cache key
// ---------------------------------------------------------------------------

/// Identity of an input. Uploads are keyed by content, paths by location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceKey {
    Upload { name: String, len: usize, digest: u64 },
    Path(PathBuf),
}

impl SourceKey {
    pub fn of(source: &DataSource) -> Self {
        match source {
            DataSource::Upload { name, bytes } => {
                let mut hasher = DefaultHasher::new();
                bytes.hash(&mut hasher);
                SourceKey::Upload {
                    name: name.to_lowercase(),
                    len: bytes.len(),
                    digest: hasher.finish(),
                }
            }
            DataSource::Path(p) => SourceKey::Path(p.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// LoadCache
// ---------------------------------------------------------------------------

/// Memoized loads, keyed by input identity.
///
/// Entries live for the whole process; nothing is ever evicted. A fallback
/// path that was missing stays `NoData` even if the file appears later.
#[derive(Debug, Default)]
pub struct LoadCache {
    entries: HashMap<SourceKey, LoadOutcome>,
}

impl LoadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `source`, parsing only on the first request for this identity.
    pub fn load(&mut self, source: &DataSource) -> LoadOutcome {
        let key = SourceKey::of(source);
        if let Some(hit) = self.entries.get(&key) {
            log::debug!("load cache hit for {}", source.label());
            return hit.clone();
        }

        let outcome = load_uncached(source);
        self.entries.insert(key, outcome.clone());
        outcome
    }

    /// Number of stored outcomes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn load_uncached(source: &DataSource) -> LoadOutcome {
    match source {
        DataSource::Upload { name, bytes } => match loader::load_upload(name, bytes) {
            Ok(table) => {
                log::info!(
                    "Loaded {} rows with columns {:?} from {name}",
                    table.len(),
                    table.column_names()
                );
                LoadOutcome::Loaded(Arc::new(table))
            }
            Err(e) => {
                log::error!("Failed to load {name}: {e}");
                LoadOutcome::Failed(format!("Could not read uploaded file: {e}"))
            }
        },
        DataSource::Path(path) => match loader::load_path(path) {
            Ok(table) => {
                log::info!("Loaded {} rows from {}", table.len(), path.display());
                LoadOutcome::Loaded(Arc::new(table))
            }
            Err(e) => {
                log::info!("No data at {}: {e}", path.display());
                LoadOutcome::NoData
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, body: &str) -> DataSource {
        DataSource::Upload {
            name: name.to_string(),
            bytes: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn identical_input_is_parsed_once() {
        let mut cache = LoadCache::new();
        let src = upload("t.csv", "Amount\n1\n");
        let first = cache.load(&src);
        let second = cache.load(&src);
        let (a, b) = (first.table().unwrap(), second.table().unwrap());
        assert!(Arc::ptr_eq(a, b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn different_content_gets_its_own_entry() {
        let mut cache = LoadCache::new();
        cache.load(&upload("t.csv", "Amount\n1\n"));
        cache.load(&upload("t.csv", "Amount\n2\n"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn missing_fallback_path_is_no_data() {
        let mut cache = LoadCache::new();
        let outcome = cache.load(&DataSource::Path("/no/such/file.csv".into()));
        assert!(matches!(outcome, LoadOutcome::NoData));
    }

    #[test]
    fn unreadable_upload_reports_a_message() {
        let mut cache = LoadCache::new();
        let outcome = cache.load(&upload("broken.xlsx", ""));
        match outcome {
            LoadOutcome::Failed(msg) => assert!(msg.starts_with("Could not read uploaded file")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}
