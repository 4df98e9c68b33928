//! Asset inspection dashboard.
//!
//! Loads inspection records from a file or a SQLite table, filters them by
//! asset type, site, inspector and inspection date, and renders KPIs, three
//! charts and the raw rows in an egui window. The [`data`] module holds the
//! loading, filtering and aggregation pipeline and has no UI dependency.

pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod state;
pub mod ui;
