use std::sync::Arc;

use chrono::NaiveDate;

use crate::color::ColorMap;
use crate::config::{DashboardConfig, SourceKind};
use crate::data::cache::{DashboardCache, LoadCache, ViewSnapshot};
use crate::data::columns::STATUS;
use crate::data::filter::{DateRange, FilterState, FilteredView};
use crate::data::loader::DataSource;
use crate::data::model::{CellValue, Dataset};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Source picker selection and the SQLite text inputs.
    pub source_kind: SourceKind,
    pub db_path: String,
    pub table_name: String,

    /// Loaded dataset (None until the operator loads one).
    pub dataset: Option<Arc<Dataset>>,

    /// Current filter selections.
    pub filters: FilterState,

    /// Rows passing the current filters and their aggregates (cached).
    pub snapshot: Option<Arc<ViewSnapshot>>,

    /// Colours per status value, shared by the pie and bar charts.
    pub status_colors: Option<ColorMap>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    load_cache: LoadCache,
    dashboard_cache: DashboardCache,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DashboardConfig::default())
    }
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        let dashboard_cache =
            DashboardCache::new(config.status_labels.clone(), config.cache_capacity);
        Self {
            source_kind: config.default_source,
            db_path: String::new(),
            table_name: config.default_table.clone(),
            dataset: None,
            filters: FilterState::default(),
            snapshot: None,
            status_colors: None,
            status_message: None,
            load_cache: LoadCache::default(),
            dashboard_cache,
            config,
        }
    }

    /// Load `source` through the cache. On failure the previous dataset stays.
    pub fn load_source(&mut self, source: &DataSource) {
        match self.load_cache.load(source) {
            Ok(dataset) => {
                log::info!(
                    "Loaded {} inspections with columns {:?} from {}",
                    dataset.len(),
                    dataset.column_names,
                    source.describe()
                );
                self.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("Failed to load {}: {e:#}", source.describe());
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Ingest a newly loaded dataset and initialise filters and colours.
    ///
    /// Reloading an unchanged source keeps the operator's selections.
    pub fn set_dataset(&mut self, dataset: Arc<Dataset>) {
        let unchanged = self
            .dataset
            .as_ref()
            .is_some_and(|current| current.fingerprint == dataset.fingerprint);

        if unchanged {
            self.filters.retain_known(&dataset);
        } else {
            self.filters = FilterState::from_dataset(&dataset);
            self.dashboard_cache.invalidate();
        }

        self.status_colors = dataset
            .unique_values
            .get(STATUS)
            .map(|statuses| ColorMap::for_statuses(statuses, &self.config.status_labels));

        self.dataset = Some(dataset);
        self.status_message = None;
        self.refilter();
    }

    /// Recompute the snapshot after a filter change.
    pub fn refilter(&mut self) {
        if let Some(ds) = &self.dataset {
            let snapshot = self.dashboard_cache.get_or_compute(ds, &self.filters);
            for e in snapshot.dashboard.errors() {
                log::warn!("Dashboard incomplete: {e}");
            }
            self.snapshot = Some(snapshot);
        }
    }

    /// The rows currently passing the filters.
    pub fn visible_view(&self) -> Option<FilteredView<'_>> {
        let dataset = self.dataset.as_deref()?;
        let snapshot = self.snapshot.as_ref()?;
        Some(FilteredView {
            dataset,
            indices: snapshot.indices.clone(),
        })
    }

    /// Toggle a single value in a column's filter.
    pub fn toggle_filter_value(&mut self, column: &str, value: &CellValue) {
        self.filters.toggle(column, value);
        self.refilter();
    }

    /// Select all values in a column.
    pub fn select_all(&mut self, column: &str) {
        if let Some(ds) = self.dataset.clone() {
            self.filters.select_all(&ds, column);
            self.refilter();
        }
    }

    /// Deselect all values in a column.
    pub fn select_none(&mut self, column: &str) {
        self.filters.select_none(column);
        self.refilter();
    }

    pub fn set_date_range(&mut self, start: NaiveDate, end: NaiveDate) {
        let range = DateRange::new(start, end);
        if self.filters.date_range != Some(range) {
            self.filters.date_range = Some(range);
            self.refilter();
        }
    }

    /// Reset every filter to "show everything".
    pub fn reset_filters(&mut self) {
        if let Some(ds) = &self.dataset {
            self.filters = FilterState::from_dataset(ds);
            self.refilter();
        }
    }

    pub fn date_range_reversed(&self) -> bool {
        self.filters.date_range.is_some_and(|r| r.is_reversed())
    }
}
