//! Reference-data lookup port

use crate::error::Result;
use crate::value::Row;
use crate::value_objects::QueryDescriptor;
use async_trait::async_trait;

/// Read-only access to reference tables
///
/// Implementations are shared across concurrent record-processing tasks and
/// must tolerate concurrent reads.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Return the single row answering `query`, or `None` when nothing matches
    ///
    /// Unknown tables are reported as errors; callers fall back to defaults.
    async fn lookup(&self, query: &QueryDescriptor) -> Result<Option<Row>>;
}

/// Data source with no tables
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDataSource;

#[async_trait]
impl DataSource for NullDataSource {
    async fn lookup(&self, _query: &QueryDescriptor) -> Result<Option<Row>> {
        Ok(None)
    }
}
