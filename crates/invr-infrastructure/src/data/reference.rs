//! Reference data file and the in-memory table source
//!
//! ```yaml
//! tables:
//!   companies:
//!     - { name: Acme Co, tax_number: "91440101234567890A", category: TRAVEL_SERVICE }
//!   tax_rates:
//!     - { category: GENERAL, min_amount: 0, max_amount: 999999, rate: 0.13 }
//! products:
//!   keywords:
//!     - { keyword: 住, standard_name: 住宿费, tax_rate: 0.13, tax_category: 增值税专票, category_code: ACCOMMODATION }
//! queries:
//!   get_tax_number_by_name:
//!     table: companies
//!     field: tax_number
//!     conditions:
//!       - { field: name, param: 0 }
//!     fallback: ""
//! ```

use crate::data::catalog::CatalogConfig;
use crate::data::named_queries::NamedQuery;
use crate::error_ext::ErrorContext;
use async_trait::async_trait;
use invr_domain::error::{Error, Result};
use invr_domain::ports::DataSource;
use invr_domain::value::Row;
use invr_domain::value_objects::QueryDescriptor;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Parsed reference data file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReferenceData {
    /// Rows per table, in file order
    pub tables: BTreeMap<String, Vec<Row>>,
    /// Product catalog; `None` selects the built-in catalog
    pub products: Option<CatalogConfig>,
    /// Named queries callable through `db_query('name', ...)`
    pub queries: BTreeMap<String, NamedQuery>,
}

impl ReferenceData {
    /// Parse reference data text; blank text is empty data
    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
            .config_context(format!("Invalid reference data in {origin}"))
    }

    /// Read reference data from `path`; a missing file yields empty data
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Reference data not found: {}", path.display());
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(path)
            .await
            .io_context(format!("Failed to read reference data {}", path.display()))?;
        let data = Self::parse(&content, &path.display().to_string())?;
        info!(
            path = %path.display(),
            tables = data.tables.len(),
            queries = data.queries.len(),
            "Reference data loaded"
        );
        Ok(data)
    }
}

/// Read-only tables held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataSource {
    tables: Arc<BTreeMap<String, Vec<Row>>>,
}

impl InMemoryDataSource {
    pub fn new(tables: BTreeMap<String, Vec<Row>>) -> Self {
        Self {
            tables: Arc::new(tables),
        }
    }

    /// Builder-style table registration for tests and embedding
    #[must_use]
    pub fn with_table(self, name: impl Into<String>, rows: Vec<Row>) -> Self {
        let mut tables = Arc::unwrap_or_clone(self.tables);
        tables.insert(name.into(), rows);
        Self::new(tables)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

#[async_trait]
impl DataSource for InMemoryDataSource {
    async fn lookup(&self, query: &QueryDescriptor) -> Result<Option<Row>> {
        let rows = self
            .tables
            .get(&query.table)
            .ok_or_else(|| Error::lookup(format!("unknown table '{}'", query.table)))?;
        Ok(query.select(rows.iter()).cloned())
    }
}
