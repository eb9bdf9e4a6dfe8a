//! bodytrend - Body-composition trend engine
//!
//! bodytrend turns a table of self-reported measurements into per-person trends
//! through a deterministic pipeline: cleaning → metric derivation → per-person
//! differencing. The processed table answers the queries a dashboard needs: the
//! person list, each person's latest values with deltas, and their history.
//!
//! ## Modules
//!
//! - **Core**: `schema`, `normalizer`, `features`, `differencer`, `query`
//! - **Collaborators**: `loader` (CSV with fallbacks), `cache` (TTL),
//!   `encoder` (JSON reports, CSV output), `config`

pub mod cache;
pub mod config;
pub mod differencer;
pub mod encoder;
pub mod error;
pub mod features;
pub mod loader;
pub mod normalizer;
pub mod pipeline;
pub mod query;
pub mod schema;
pub mod types;

pub use cache::TableCache;
pub use config::PipelineConfig;
pub use error::TrendError;
pub use loader::{CsvFileSource, CsvReaderSource, TableSource};
pub use pipeline::{process_detected, process_table, TrendProcessor};
pub use query::ProcessedTable;
pub use schema::{RawTable, SchemaMapping};
pub use types::{LatestSnapshot, Metric, MetricValue, SeriesPoint};

/// bodytrend version embedded in all reports
pub const BODYTREND_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "bodytrend";
