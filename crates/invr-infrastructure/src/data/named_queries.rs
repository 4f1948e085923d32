//! Named queries: `db_query('get_tax_number_by_name', supplier.name)`
//!
//! Each query maps positional arguments onto the conditions of a structured
//! lookup. A lookup that finds nothing, or fails, yields the query's declared
//! fallback; only an unknown query name or a missing argument is an error.

use crate::constants::NAMED_QUERY_FUNCTION;
use async_trait::async_trait;
use invr_domain::error::{Error, Result};
use invr_domain::ports::{DataSource, FunctionHost};
use invr_domain::value::Value;
use invr_domain::value_objects::{ConditionValue, QueryCondition, QueryDescriptor, QueryOperator};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

fn default_operator() -> QueryOperator {
    QueryOperator::Eq
}

/// Column compared against one positional argument
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NamedCondition {
    pub field: String,
    #[serde(default = "default_operator")]
    pub operator: QueryOperator,
    /// Zero-based index into the arguments after the query name
    pub param: usize,
}

/// A configured lookup
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NamedQuery {
    pub table: String,
    /// Projected column; absent returns the whole row
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub conditions: Vec<NamedCondition>,
    #[serde(default)]
    pub fallback: Value,
    #[serde(default)]
    pub description: Option<String>,
}

impl NamedQuery {
    /// Bind positional arguments into a descriptor
    pub fn bind(&self, name: &str, params: &[Value]) -> Result<QueryDescriptor> {
        let mut descriptor = QueryDescriptor::new(&self.table, self.field.clone());
        for condition in &self.conditions {
            let value = params.get(condition.param).ok_or_else(|| {
                Error::invalid_argument(format!(
                    "query '{name}' needs argument {} for '{}'",
                    condition.param, condition.field
                ))
            })?;
            let value = match (condition.operator, value) {
                (QueryOperator::In | QueryOperator::NotIn, Value::List(items)) => {
                    ConditionValue::List(items.clone())
                }
                (_, other) => ConditionValue::Single(other.clone()),
            };
            descriptor = descriptor.with_condition(QueryCondition::new(
                &condition.field,
                condition.operator,
                value,
            ));
        }
        Ok(descriptor)
    }
}

/// Host serving `db_query` from configured queries
pub struct NamedQueries {
    queries: BTreeMap<String, NamedQuery>,
    data_source: Arc<dyn DataSource>,
}

impl NamedQueries {
    pub fn new(queries: BTreeMap<String, NamedQuery>, data_source: Arc<dyn DataSource>) -> Self {
        Self {
            queries,
            data_source,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }

    /// Run a named query with positional parameters
    pub async fn run(&self, name: &str, params: &[Value]) -> Result<Value> {
        let query = self
            .queries
            .get(name)
            .ok_or_else(|| Error::not_found(format!("query '{name}'")))?;
        let descriptor = query.bind(name, params)?;
        match self.data_source.lookup(&descriptor).await {
            Ok(Some(row)) => {
                let value = descriptor.project(&row);
                if value.is_null() {
                    Ok(query.fallback.clone())
                } else {
                    Ok(value)
                }
            }
            Ok(None) => {
                debug!(query = name, "Named query found no row");
                Ok(query.fallback.clone())
            }
            Err(e) => {
                warn!(query = name, error = %e, "Named query failed, using fallback");
                Ok(query.fallback.clone())
            }
        }
    }
}

#[async_trait]
impl FunctionHost for NamedQueries {
    fn has_function(&self, name: &str) -> bool {
        name == NAMED_QUERY_FUNCTION
    }

    async fn call(&self, name: &str, args: &[Value], _context: &Value) -> Result<Value> {
        if name != NAMED_QUERY_FUNCTION {
            return Err(Error::not_found(format!("function '{name}'")));
        }
        match args.split_first() {
            Some((Value::String(query), params)) => self.run(query, params).await,
            _ => Err(Error::invalid_argument(format!(
                "{NAMED_QUERY_FUNCTION} expects a query name as its first argument"
            ))),
        }
    }

    fn default_value(&self, _name: &str) -> Value {
        Value::Null
    }
}

impl std::fmt::Debug for NamedQueries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedQueries")
            .field("queries", &self.queries.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
