//! Smart query execution against a data source

use super::parser::{ConditionSpec, Operand, SmartQuery, ValueRef};
use crate::constants::DEFAULT_LOOKUP_TIMEOUT;
use crate::expression::Scope;
use invr_domain::constants::{DEFAULT_CATEGORY, DEFAULT_NAME, DEFAULT_TAX_NUMBER, DEFAULT_TAX_RATE};
use invr_domain::error::Error;
use invr_domain::ports::DataSource;
use invr_domain::value::{Value, parse_decimal};
use invr_domain::value_objects::{ConditionValue, QueryCondition, QueryDescriptor};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Values substituted when a lookup cannot produce an answer
///
/// Keys are either `table.field` or a bare `field`; the qualified key wins.
/// Fields with no declared default fall back to null.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefaults {
    by_key: BTreeMap<String, Value>,
}

impl Default for FieldDefaults {
    fn default() -> Self {
        let rate = parse_decimal(DEFAULT_TAX_RATE).map_or(Value::Null, Value::Number);
        Self::empty()
            .with("tax_number", DEFAULT_TAX_NUMBER)
            .with("name", DEFAULT_NAME)
            .with("category", DEFAULT_CATEGORY)
            .with("rate", rate)
    }
}

impl FieldDefaults {
    pub fn empty() -> Self {
        Self {
            by_key: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.by_key.insert(key.into(), value.into());
        self
    }

    /// Merge configured defaults over the built-in ones
    #[must_use]
    pub fn extend(mut self, overrides: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.by_key.extend(overrides);
        self
    }

    /// Default for a query's projected field
    pub fn for_query(&self, table: &str, field: Option<&str>) -> Value {
        let Some(field) = field else {
            return Value::Null;
        };
        self.by_key
            .get(&format!("{table}.{field}"))
            .or_else(|| self.by_key.get(field))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

/// Answer to one smart query
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The data source returned a row
    Found(Value),
    /// The lookup failed or matched nothing; the default was used
    Fallback { value: Value, reason: String },
}

impl Resolution {
    pub fn value(&self) -> &Value {
        match self {
            Self::Found(value) | Self::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Found(value) | Self::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Resolves smart queries against a [`DataSource`] with a per-lookup timeout
#[derive(Clone)]
pub struct SmartQueryEngine {
    data_source: Arc<dyn DataSource>,
    defaults: FieldDefaults,
    timeout: Duration,
}

impl SmartQueryEngine {
    pub fn new(data_source: Arc<dyn DataSource>) -> Self {
        Self {
            data_source,
            defaults: FieldDefaults::default(),
            timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_defaults(mut self, defaults: FieldDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn defaults(&self) -> &FieldDefaults {
        &self.defaults
    }

    /// Default for a query that could not be parsed or answered
    pub fn default_for(&self, table: &str, field: Option<&str>) -> Value {
        self.defaults.for_query(table, field)
    }

    /// Resolve condition values against `scope` into a structured lookup
    pub fn descriptor(&self, query: &SmartQuery, scope: &Scope) -> Result<QueryDescriptor, String> {
        query.conditions.iter().try_fold(
            QueryDescriptor::new(&query.table, query.field.clone()),
            |descriptor, spec| Ok(descriptor.with_condition(resolve_condition(spec, scope)?)),
        )
    }

    /// Execute a query; never fails, falling back to the declared default
    pub async fn execute(&self, query: &SmartQuery, scope: &Scope) -> Resolution {
        let fallback = |reason: String| Resolution::Fallback {
            value: self.default_for(&query.table, query.field.as_deref()),
            reason,
        };

        let descriptor = match self.descriptor(query, scope) {
            Ok(descriptor) => descriptor,
            Err(reason) => {
                debug!(query = %query, reason = %reason, "Smart query condition unresolved");
                return fallback(reason);
            }
        };

        match tokio::time::timeout(self.timeout, self.data_source.lookup(&descriptor)).await {
            Err(_) => {
                let err = Error::timeout("lookup", millis(self.timeout));
                warn!(query = %descriptor, error = %err, "Smart query timed out");
                fallback(err.to_string())
            }
            Ok(Err(e)) => {
                warn!(query = %descriptor, error = %e, "Smart query lookup failed");
                fallback(e.to_string())
            }
            Ok(Ok(None)) => {
                debug!(query = %descriptor, "Smart query matched no row");
                fallback("no matching row".to_string())
            }
            Ok(Ok(Some(row))) => match &descriptor.field {
                Some(field) if !row.contains_key(field) => {
                    fallback(format!("column '{field}' not present in '{}'", descriptor.table))
                }
                _ => Resolution::Found(descriptor.project(&row)),
            },
        }
    }
}

impl std::fmt::Debug for SmartQueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartQueryEngine")
            .field("defaults", &self.defaults)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn resolve_condition(spec: &ConditionSpec, scope: &Scope) -> Result<QueryCondition, String> {
    let value = match &spec.operand {
        Operand::Single(value) => ConditionValue::Single(resolve_value(value, scope)?),
        Operand::List(values) => ConditionValue::List(
            values
                .iter()
                .map(|v| resolve_value(v, scope))
                .collect::<Result<_, _>>()?,
        ),
        Operand::Range(low, high) => {
            ConditionValue::Range(resolve_value(low, scope)?, resolve_value(high, scope)?)
        }
    };
    Ok(QueryCondition::new(&spec.field, spec.operator, value))
}

fn resolve_value(value: &ValueRef, scope: &Scope) -> Result<Value, String> {
    match value {
        ValueRef::Literal(v) => Ok(v.clone()),
        ValueRef::Variable(path) => {
            let (head, rest) = path
                .split_first()
                .ok_or_else(|| "empty variable reference".to_string())?;
            scope
                .variable(head)
                .and_then(|v| v.get_path(rest))
                .or_else(|| scope.resolve_path(path))
                .cloned()
                .ok_or_else(|| format!("variable '${}' is not bound", path.join(".")))
        }
        ValueRef::Path(path) => scope
            .resolve_path(path)
            .cloned()
            .ok_or_else(|| format!("path '{}' not found in record", path.join("."))),
        ValueRef::Word(word) => Ok(scope
            .lookup(word)
            .cloned()
            .unwrap_or_else(|| Value::String(word.clone()))),
    }
}

/// Whole milliseconds of a timeout budget, saturating
pub fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
