//! Rule repository, lookup and batch configuration types

use crate::constants::{
    DEFAULT_BATCH_CONCURRENCY, DEFAULT_CALL_TIMEOUT_MS, DEFAULT_LOOKUP_TIMEOUT_MS,
    DEFAULT_REFERENCE_DATA_PATH, DEFAULT_RULES_PATH, LOOKUP_CACHE_MAX_ENTRIES,
    LOOKUP_CACHE_TTL_SECS,
};
use invr_domain::error::Result;
use invr_domain::value::Value;
use invr_engine::{MergePlan, MergeStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Where rules come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// A rule file, or a directory of `*.yaml` / `*.yml` rule files
    pub path: PathBuf,

    /// Reload the rule set when the files change
    pub watch: bool,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_RULES_PATH),
            watch: false,
        }
    }
}

/// Smart-query execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmartQueryConfig {
    /// Budget for one lookup before the declared default is used
    pub lookup_timeout_ms: u64,

    /// Cache lookup results
    pub cache_enabled: bool,

    /// Lifetime of a cached lookup result
    pub cache_ttl_secs: u64,

    /// Maximum cached lookup results
    pub cache_max_entries: u64,

    /// Extra or replacement lookup defaults, keyed `field` or `table.field`
    pub field_defaults: BTreeMap<String, Value>,
}

impl SmartQueryConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for SmartQueryConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_ms: DEFAULT_LOOKUP_TIMEOUT_MS,
            cache_enabled: true,
            cache_ttl_secs: LOOKUP_CACHE_TTL_SECS,
            cache_max_entries: LOOKUP_CACHE_MAX_ENTRIES,
            field_defaults: BTreeMap::new(),
        }
    }
}

/// Auxiliary function settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionsConfig {
    /// Budget for one auxiliary call before its default is used
    pub call_timeout_ms: u64,

    /// Per-function fallback values, overriding the catalog's own
    pub defaults: BTreeMap<String, Value>,
}

impl FunctionsConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

impl Default for FunctionsConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            defaults: BTreeMap::new(),
        }
    }
}

/// Batch processing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Records processed at the same time
    pub concurrency: usize,

    /// How completed records are merged before validation
    pub merge_strategy: MergeStrategy,

    /// Grouping paths added to the strategy's own; required for `custom`
    pub merge_keys: Vec<String>,

    /// Split records holding more line items than this
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items_per_invoice: Option<usize>,
}

impl BatchConfig {
    /// Merge plan described by these settings
    pub fn merge_plan(&self) -> Result<MergePlan> {
        let mut plan = MergePlan::new(self.merge_strategy).with_keys(&self.merge_keys)?;
        if let Some(max_items) = self.max_items_per_invoice {
            plan = plan.with_max_items(max_items);
        }
        plan.validate()?;
        Ok(plan)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_BATCH_CONCURRENCY,
            merge_strategy: MergeStrategy::None,
            merge_keys: Vec::new(),
            max_items_per_invoice: None,
        }
    }
}

/// Reference tables, product catalog and named queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceDataConfig {
    /// YAML file; a missing file means empty tables and the built-in catalog
    pub path: PathBuf,
}

impl Default for ReferenceDataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_REFERENCE_DATA_PATH),
        }
    }
}
