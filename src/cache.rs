//! Time-bounded cache for loaded source tables
//!
//! Sits in front of any `TableSource`. Entries are keyed by the source id and
//! hold the table with its fetch time; an entry older than the TTL is reloaded.
//! The processing pipeline never sees the cache, only the table it returns.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::error::TrendError;
use crate::loader::TableSource;
use crate::schema::RawTable;

/// Default TTL in seconds
pub const DEFAULT_TTL_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct CacheEntry {
    table: RawTable,
    fetched_at: DateTime<Utc>,
}

/// TTL cache of raw tables, safe to share between threads
#[derive(Debug)]
pub struct TableCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl Default for TableCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TTL_SECS))
    }
}

impl TableCache {
    /// Create a cache whose entries expire after `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached table for `source`, loading it if absent or expired
    pub fn get_or_load<S: TableSource + ?Sized>(&self, source: &S) -> Result<RawTable, TrendError> {
        self.get_or_load_at(source, Utc::now())
    }

    /// Same as [`get_or_load`](Self::get_or_load) with an explicit clock reading.
    ///
    /// The lock is held across the load so concurrent callers for an expired
    /// entry trigger one load and never see a half-written entry. A failed load
    /// is returned unchanged and keeps the previous entry.
    pub fn get_or_load_at<S: TableSource + ?Sized>(
        &self,
        source: &S,
        now: DateTime<Utc>,
    ) -> Result<RawTable, TrendError> {
        let key = source.id();
        let mut entries = self.lock();

        if let Some(entry) = entries.get(&key) {
            if now - entry.fetched_at < self.ttl {
                debug!(source = %key, "table cache hit");
                return Ok(entry.table.clone());
            }
        }

        debug!(source = %key, "table cache miss, loading");
        let table = source.load()?;
        entries.insert(
            key,
            CacheEntry {
                table: table.clone(),
                fetched_at: now,
            },
        );
        Ok(table)
    }

    /// When the entry for `source_id` was fetched, if cached
    pub fn fetched_at(&self, source_id: &str) -> Option<DateTime<Utc>> {
        self.lock().get(source_id).map(|e| e.fetched_at)
    }

    /// Drop the entry for one source
    pub fn invalidate(&self, source_id: &str) {
        self.lock().remove(source_id);
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
