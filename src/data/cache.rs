use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use sha2::{Digest, Sha256};

use super::aggregate::{Dashboard, StatusLabels};
use super::filter::{self, FilterState};
use super::loader::{self, DataSource, FileFormat, LoadError};
use super::model::Dataset;

// ---------------------------------------------------------------------------
// Source identity
// ---------------------------------------------------------------------------

/// Content / identity hash of a data source.
///
/// * file payloads: SHA-256 of the bytes plus the format
/// * SQLite tables: canonical path, table name, file size and mtime
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceKey(String);

impl SourceKey {
    pub fn from_bytes(format: FileFormat, bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        SourceKey(format!("{}:{}", format.tag(), hex::encode(digest)))
    }

    pub fn from_sqlite(db_path: &Path, table: &str) -> Result<Self, LoadError> {
        let canonical = db_path
            .canonicalize()
            .map_err(|e| LoadError::io(db_path, e))?;
        let meta = std::fs::metadata(&canonical).map_err(|e| LoadError::io(db_path, e))?;
        let modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        hasher.update(table.as_bytes());
        hasher.update(meta.len().to_le_bytes());
        hasher.update(modified.to_le_bytes());
        Ok(SourceKey(format!("sqlite:{}", hex::encode(hasher.finalize()))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Load cache
// ---------------------------------------------------------------------------

/// Memoized loader results, most recently used last.
pub struct LoadCache {
    capacity: usize,
    entries: VecDeque<(SourceKey, Arc<Dataset>)>,
}

impl Default for LoadCache {
    fn default() -> Self {
        Self::new(4)
    }
}

impl LoadCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    /// Load `source`, reusing an earlier result when the source is unchanged.
    pub fn load(&mut self, source: &DataSource) -> Result<Arc<Dataset>, LoadError> {
        match source {
            DataSource::File(path) => {
                let format = FileFormat::from_path(path)?;
                let bytes = std::fs::read(path).map_err(|e| LoadError::io(path, e))?;
                let key = SourceKey::from_bytes(format, &bytes);
                if let Some(hit) = self.get(&key) {
                    return Ok(hit);
                }
                let dataset = loader::load_bytes(format, bytes)?;
                Ok(self.insert(key, dataset))
            }
            DataSource::Sqlite { db_path, table } => {
                let key = SourceKey::from_sqlite(db_path, table)?;
                if let Some(hit) = self.get(&key) {
                    return Ok(hit);
                }
                let dataset = loader::load_sqlite(db_path, table)?;
                Ok(self.insert(key, dataset))
            }
        }
    }

    fn get(&mut self, key: &SourceKey) -> Option<Arc<Dataset>> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        let entry = self.entries.remove(pos)?;
        let dataset = Arc::clone(&entry.1);
        self.entries.push_back(entry);
        log::debug!("load cache hit for {}", key.as_str());
        Some(dataset)
    }

    fn insert(&mut self, key: SourceKey, dataset: Dataset) -> Arc<Dataset> {
        let dataset = Arc::new(dataset);
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((key, Arc::clone(&dataset)));
        dataset
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ---------------------------------------------------------------------------
// Dashboard cache
// ---------------------------------------------------------------------------

/// Result of one filter pass: surviving rows plus the aggregates over them.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot {
    pub indices: Vec<usize>,
    pub dashboard: Dashboard,
}

/// Recent [`ViewSnapshot`]s keyed by (dataset fingerprint, filter state).
pub struct DashboardCache {
    capacity: usize,
    labels: StatusLabels,
    entries: VecDeque<((String, FilterState), Arc<ViewSnapshot>)>,
}

impl DashboardCache {
    pub fn new(labels: StatusLabels, capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            labels,
            entries: VecDeque::new(),
        }
    }

    pub fn get_or_compute(&mut self, dataset: &Dataset, filters: &FilterState) -> Arc<ViewSnapshot> {
        let hit = self
            .entries
            .iter()
            .find(|((fingerprint, state), _)| *fingerprint == dataset.fingerprint && state == filters);
        if let Some((_, snapshot)) = hit {
            return Arc::clone(snapshot);
        }

        let view = filter::apply(dataset, filters);
        let dashboard = Dashboard::compute(&view, &self.labels);
        let snapshot = Arc::new(ViewSnapshot {
            indices: view.indices,
            dashboard,
        });

        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((
            (dataset.fingerprint.clone(), filters.clone()),
            Arc::clone(&snapshot),
        ));
        snapshot
    }

    /// Forget everything; called whenever a new dataset is loaded.
    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
