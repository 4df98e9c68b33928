use thiserror::Error;

// ---------------------------------------------------------------------------
// Well-known column names
// ---------------------------------------------------------------------------

pub const INSPECTION_DATE: &str = "inspection_date";
pub const DUE_DATE: &str = "due_date";
pub const STATUS: &str = "status";
pub const ASSET_TYPE: &str = "asset_type";
pub const SITE: &str = "site";
pub const INSPECTOR: &str = "inspector";

/// Columns parsed as calendar dates by every loader.
pub const DATE_COLUMNS: [&str; 2] = [INSPECTION_DATE, DUE_DATE];

/// Optional categorical filter columns, in sidebar order.
pub const CATEGORICAL_FILTER_COLUMNS: [&str; 3] = [ASSET_TYPE, SITE, INSPECTOR];

/// A KPI or aggregate was requested but a column it depends on is absent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("required column '{0}' is missing from the dataset")]
    MissingColumn(&'static str),
}

// ---------------------------------------------------------------------------
// Capabilities – column presence, resolved once per dataset
// ---------------------------------------------------------------------------

/// Which well-known columns a dataset carries.
///
/// Resolved from the schema when the dataset is built; the filter sidebar,
/// the filter pipeline and the aggregation engine all read it instead of
/// probing column names themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub asset_type: bool,
    pub site: bool,
    pub inspector: bool,
    pub inspection_date: bool,
    pub due_date: bool,
    pub status: bool,
}

impl Capabilities {
    /// Inspect a column set. Never fails: absent columns just disable things.
    pub fn resolve<'a>(columns: impl IntoIterator<Item = &'a str>) -> Self {
        let mut caps = Capabilities::default();
        for col in columns {
            match col {
                ASSET_TYPE => caps.asset_type = true,
                SITE => caps.site = true,
                INSPECTOR => caps.inspector = true,
                INSPECTION_DATE => caps.inspection_date = true,
                DUE_DATE => caps.due_date = true,
                STATUS => caps.status = true,
                _ => {}
            }
        }
        caps
    }

    pub fn has(&self, column: &str) -> bool {
        match column {
            ASSET_TYPE => self.asset_type,
            SITE => self.site,
            INSPECTOR => self.inspector,
            INSPECTION_DATE => self.inspection_date,
            DUE_DATE => self.due_date,
            STATUS => self.status,
            _ => false,
        }
    }

    /// Categorical filters the dataset supports, in sidebar order.
    pub fn categorical_filters(&self) -> Vec<&'static str> {
        CATEGORICAL_FILTER_COLUMNS
            .into_iter()
            .filter(|col| self.has(col))
            .collect()
    }

    /// Whether the inspection date range filter applies.
    pub fn date_filter(&self) -> bool {
        self.inspection_date
    }

    /// Fail with [`SchemaError::MissingColumn`] unless every column is present.
    pub fn require(&self, columns: &[&'static str]) -> Result<(), SchemaError> {
        match columns.iter().find(|col| !self.has(col)) {
            Some(missing) => Err(SchemaError::MissingColumn(*missing)),
            None => Ok(()),
        }
    }
}
