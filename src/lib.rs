//! # DRE Report
//!
//! Builds a standardized income statement ("DRE") out of loosely structured
//! monthly spreadsheets, one row per contract/client/month.
//!
//! The pipeline is:
//!
//! - [`cache::SourceCache`] parses raw bytes once per content fingerprint and
//!   sheet name, through a pluggable [`loader::TabularLoader`].
//! - [`dataset::Dataset`] resolves canonical fields ([`alias`]) and normalizes
//!   every period ([`period`]) so filters compare on `YYYY-MM`.
//! - [`dre::aggregate`] and [`group::aggregate_by`] sum the filtered rows into
//!   [`dre::DreBlock`]s; [`variance::compare`] sets a budget block against an
//!   actual one.
//! - [`reports`] and [`output`] flatten the results for CSV/JSON export.
//!
//! Missing columns, odd period codes and zero denominators never fail; only a
//! source with nothing to load is an error.
//!
//! ```rust,ignore
//! use dre_report::*;
//!
//! let config = DreConfig::default();
//! let mut cache = SourceCache::new(AutoLoader);
//! let bytes = std::fs::read("BD.xlsx")?;
//! let source = cache.load(&bytes, &config.actual.sheet)?;
//! let dataset = Dataset::new(source, &config.actual)?;
//! let block = dataset.dre(&RecordFilter::client("ACME", "09/2025"));
//! println!("margin: {}", block.contribution_margin());
//! ```

pub mod alias;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod dre;
pub mod error;
pub mod group;
pub mod loader;
pub mod output;
pub mod period;
pub mod reports;
pub mod types;
pub mod util;
pub mod variance;

pub use alias::{resolve, resolve_structural, AliasTable, CanonicalField, ColumnFallback, ResolvedFields};
pub use cache::{resolve_sheet, Fingerprint, LoadedSource, SourceCache};
pub use config::{DreConfig, SourceProfile};
pub use dataset::{Dataset, RecordFilter};
pub use dre::{aggregate, DreBlock, DreLine, LineKind};
pub use error::{DreError, Result};
pub use group::{aggregate_by, GroupKey, GroupedBlocks, RankMetric, RankingEntry, SortOrder};
pub use loader::{AutoLoader, CsvLoader, SpreadsheetLoader, TabularLoader};
pub use period::{normalize, normalize_text, Period};
pub use types::{Scalar, Table};
pub use variance::{compare, compare_cost_lines, VarianceRow};
