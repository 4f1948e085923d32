//! Reference data adapters
//!
//! | Type | Port | Purpose |
//! |------|------|---------|
//! | [`InMemoryDataSource`] | `DataSource` | Tables loaded from the reference data file |
//! | [`CachedDataSource`] | `DataSource` | TTL cache in front of another source |
//! | [`ProductCatalog`] | `FunctionHost` | `get_tax_rate(description)` and friends |
//! | [`NamedQueries`] | `FunctionHost` | `db_query('name', args...)` |
//! | [`FunctionRegistry`] | `FunctionHost` | Combines hosts, applies configured defaults |

pub mod cached;
pub mod catalog;
pub mod named_queries;
pub mod reference;
pub mod registry;

pub use cached::CachedDataSource;
pub use catalog::{CatalogConfig, ProductCatalog, ProductEntry};
pub use named_queries::{NamedCondition, NamedQueries, NamedQuery};
pub use reference::{InMemoryDataSource, ReferenceData};
pub use registry::FunctionRegistry;
