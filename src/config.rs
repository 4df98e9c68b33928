use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::aggregate::StatusLabels;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV: &str = "INSPECTION_DASHBOARD_CONFIG";

/// Which source the sidebar offers first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Csv,
    Sqlite,
}

/// Start-up settings. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub window_title: String,
    pub window_size: [f32; 2],
    pub sidebar_width: f32,
    pub default_source: SourceKind,
    /// Table read from a SQLite database unless the operator types another.
    pub default_table: String,
    pub status_labels: StatusLabels,
    /// Filter states remembered per dataset.
    pub cache_capacity: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            window_title: "Asset Inspection Dashboard".to_string(),
            window_size: [1280.0, 860.0],
            sidebar_width: 260.0,
            default_source: SourceKind::Csv,
            default_table: "inspections".to_string(),
            status_labels: StatusLabels::default(),
            cache_capacity: 16,
        }
    }
}

impl DashboardConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("parsing dashboard config")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Read the file named by [`CONFIG_ENV`], or fall back to defaults.
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                let config = Self::from_file(Path::new(&path))?;
                log::info!("Loaded config from {}", Path::new(&path).display());
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }
}
