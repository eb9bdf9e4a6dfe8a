//! Pipeline orchestration
//!
//! This module provides the public API for bodytrend.
//! It runs the full transformation from a raw table to a processed table.

use tracing::{debug, info};

use crate::cache::TableCache;
use crate::differencer::TemporalDifferencer;
use crate::error::TrendError;
use crate::features::MetricDeriver;
use crate::loader::TableSource;
use crate::normalizer::Cleaner;
use crate::query::ProcessedTable;
use crate::schema::{RawTable, SchemaMapping};

/// Process a raw table under an explicit schema mapping.
///
/// Pipeline stages:
/// 1. Cleaner - Coerce cells, drop invalid rows
/// 2. MetricDeriver - Lean body mass and FFMI per row
/// 3. TemporalDifferencer - Per-person chronological deltas
///
/// The input is only borrowed; every stage works on its own copy, so callers
/// may share one `RawTable` across threads.
pub fn process_table(
    raw: &RawTable,
    mapping: &SchemaMapping,
) -> Result<ProcessedTable, TrendError> {
    // Stage 1: Clean rows
    let cleaned = Cleaner::clean(raw, mapping)?;

    // Stage 2: Derive metrics
    let derived = cleaned
        .records
        .into_iter()
        .map(MetricDeriver::derive)
        .collect::<Vec<_>>();

    // Stage 3: Difference within each person
    let processed = TemporalDifferencer::difference(derived);
    debug!(records = processed.len(), "differenced measurements");

    Ok(ProcessedTable::new(
        cleaned.mapping,
        cleaned.headers,
        processed,
        cleaned.report,
    ))
}

/// Process a raw table, resolving the layout from its header.
pub fn process_detected(raw: &RawTable) -> Result<ProcessedTable, TrendError> {
    let mapping = SchemaMapping::resolve(raw.headers())?;
    info!(has_height = mapping.has_height(), "resolved source layout");
    process_table(raw, &mapping)
}

/// Ties a source, an optional fixed mapping and an optional load cache together.
///
/// Every `process` call rebuilds the processed table from the (possibly cached)
/// raw table. Load failures from the source are returned unchanged.
pub struct TrendProcessor<S: TableSource> {
    source: S,
    mapping: Option<SchemaMapping>,
    cache: Option<TableCache>,
}

impl<S: TableSource> TrendProcessor<S> {
    /// Create a processor that detects the layout and loads on every call
    pub fn new(source: S) -> Self {
        Self {
            source,
            mapping: None,
            cache: None,
        }
    }

    /// Use a fixed mapping instead of layout detection
    pub fn with_mapping(mut self, mapping: SchemaMapping) -> Self {
        self.mapping = Some(mapping);
        self
    }

    /// Put a TTL cache in front of the source
    pub fn with_cache(mut self, cache: TableCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Load the raw table, through the cache when one is configured
    pub fn load(&self) -> Result<RawTable, TrendError> {
        match &self.cache {
            Some(cache) => cache.get_or_load(&self.source),
            None => self.source.load(),
        }
    }

    /// Load and process, rebuilding the processed table from scratch
    pub fn process(&self) -> Result<ProcessedTable, TrendError> {
        let raw = self.load()?;
        match &self.mapping {
            Some(mapping) => process_table(&raw, mapping),
            None => process_detected(&raw),
        }
    }
}
