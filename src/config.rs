//! Pipeline configuration
//!
//! Loaded from a JSON file; every field has a default so an empty object is a
//! valid config.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::cache::{TableCache, DEFAULT_TTL_SECS};

/// Largest TTL `chrono::Duration` can hold, in seconds
pub const MAX_CACHE_TTL_SECS: i64 = i64::MAX / 1000;
use crate::error::TrendError;
use crate::loader::CsvFileSource;
use crate::schema::SchemaMapping;

/// Settings for loading and processing the measurement table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// CSV files tried in order; later entries are fallbacks
    pub sources: Vec<PathBuf>,
    /// Fixed mapping; when absent the layout is detected from the header
    pub schema: Option<SchemaMapping>,
    /// Lifetime of a cached load, in seconds
    pub cache_ttl_secs: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            schema: None,
            cache_ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

impl PipelineConfig {
    /// Parse a JSON config
    pub fn from_json(json: &str) -> Result<Self, TrendError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file
    pub fn from_file(path: &Path) -> Result<Self, TrendError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, TrendError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), TrendError> {
        if self.cache_ttl_secs < 0 {
            return Err(TrendError::ConfigError(format!(
                "cache_ttl_secs must not be negative (got {})",
                self.cache_ttl_secs
            )));
        }
        if self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(TrendError::ConfigError(format!(
                "cache_ttl_secs must be at most {MAX_CACHE_TTL_SECS} (got {})",
                self.cache_ttl_secs
            )));
        }
        Ok(())
    }

    /// File source over the configured paths
    pub fn file_source(&self) -> Result<CsvFileSource, TrendError> {
        CsvFileSource::with_fallbacks(self.sources.clone())
    }

    /// Cache with the configured TTL
    pub fn cache(&self) -> Result<TableCache, TrendError> {
        self.validate()?;
        let ttl = Duration::try_seconds(self.cache_ttl_secs).ok_or_else(|| {
            TrendError::ConfigError(format!("cache_ttl_secs out of range ({})", self.cache_ttl_secs))
        })?;
        Ok(TableCache::new(ttl))
    }
}
