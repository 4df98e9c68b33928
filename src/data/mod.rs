//! Data layer: core types, loading, filtering and aggregation.
//!
//! Architecture:
//! ```text
//!  .csv / .json / .parquet        SQLite table
//!        │                            │
//!        └────────────┬───────────────┘
//!                     ▼
//!   ┌──────────────────────────┐
//!   │  loader (via cache)       │  parse source → Dataset
//!   └──────────────────────────┘
//!                     │
//!                     ▼
//!   ┌──────────────────────────┐
//!   │ Dataset                   │  Vec<Record>, column index, Capabilities
//!   └──────────────────────────┘
//!                     │
//!                     ▼
//!   ┌──────────────────────────┐
//!   │  filter                   │  categorical + date predicates → FilteredView
//!   └──────────────────────────┘
//!                     │
//!                     ▼
//!   ┌──────────────────────────┐
//!   │  aggregate                │  KPIs, status / monthly / asset-type tables
//!   └──────────────────────────┘
//! ```

pub mod aggregate;
pub mod cache;
pub mod columns;
pub mod filter;
pub mod loader;
pub mod model;
