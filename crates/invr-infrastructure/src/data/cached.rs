//! Moka-backed lookup cache
//!
//! Wraps any [`DataSource`] and remembers found rows for a fixed TTL, keyed
//! by the descriptor's canonical text. Misses and errors are not cached.

use crate::constants::{LOOKUP_CACHE_MAX_ENTRIES, LOOKUP_CACHE_TTL_SECS};
use async_trait::async_trait;
use invr_domain::error::Result;
use invr_domain::ports::DataSource;
use invr_domain::value::Row;
use invr_domain::value_objects::QueryDescriptor;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Caching decorator over a data source
#[derive(Clone)]
pub struct CachedDataSource {
    inner: Arc<dyn DataSource>,
    cache: Cache<String, Row>,
}

impl CachedDataSource {
    /// Cache with the default capacity and TTL
    pub fn new(inner: Arc<dyn DataSource>) -> Self {
        Self::with_config(
            inner,
            LOOKUP_CACHE_MAX_ENTRIES,
            Duration::from_secs(LOOKUP_CACHE_TTL_SECS),
        )
    }

    pub fn with_config(
        inner: Arc<dyn DataSource>,
        max_entries: u64,
        time_to_live: Duration,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(time_to_live)
            .build();
        Self { inner, cache }
    }

    /// Number of cached rows
    pub async fn entry_count(&self) -> u64 {
        // pending tasks must run for the count to be accurate
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    /// Drop every cached row
    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

#[async_trait]
impl DataSource for CachedDataSource {
    async fn lookup(&self, query: &QueryDescriptor) -> Result<Option<Row>> {
        let key = query.cache_key();
        if let Some(row) = self.cache.get(&key).await {
            trace!(query = %key, "Lookup cache hit");
            return Ok(Some(row));
        }
        let found = self.inner.lookup(query).await?;
        if let Some(row) = &found {
            self.cache.insert(key, row.clone()).await;
        }
        Ok(found)
    }
}

impl std::fmt::Debug for CachedDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedDataSource")
            .field("entries", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}
