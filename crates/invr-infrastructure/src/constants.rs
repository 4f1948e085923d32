//! Infrastructure layer constants
//!
//! Defaults for configuration discovery, logging, the rule repository and
//! reference-data lookups.

// ============================================================================
// CONFIGURATION CONSTANTS
// ============================================================================

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "invr.toml";

/// Default configuration directory name
pub const DEFAULT_CONFIG_DIR: &str = "invr";

/// Environment variable prefix for configuration overrides
pub const CONFIG_ENV_PREFIX: &str = "INVR";

/// Separator between nested keys in environment overrides (`INVR_BATCH__CONCURRENCY`)
pub const CONFIG_ENV_SEPARATOR: &str = "__";

// ============================================================================
// LOGGING CONSTANTS
// ============================================================================

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable holding an `EnvFilter` directive
pub const LOG_FILTER_ENV: &str = "INVR_LOG";

/// Maximum number of rotated log files
pub const LOG_MAX_FILES: usize = 5;

/// File stem used when the configured log path has none
pub const LOG_FILE_STEM: &str = "invr";

// ============================================================================
// RULE REPOSITORY CONSTANTS
// ============================================================================

/// Default rule file or directory
pub const DEFAULT_RULES_PATH: &str = "rules";

/// File extensions picked up when loading a rule directory
pub const RULE_FILE_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Delay before reloading after a file event, letting editors finish writing
pub const RULE_RELOAD_DEBOUNCE_MS: u64 = 100;

/// Capacity of the rule watcher event channel
pub const RULE_EVENT_CHANNEL_CAPACITY: usize = 16;

// ============================================================================
// LOOKUP CONSTANTS
// ============================================================================

/// Default smart-query lookup budget in milliseconds
pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 2000;

/// Default auxiliary function call budget in milliseconds
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 2000;

/// Default lookup cache TTL in seconds
pub const LOOKUP_CACHE_TTL_SECS: u64 = 300;

/// Default lookup cache capacity
pub const LOOKUP_CACHE_MAX_ENTRIES: u64 = 1000;

/// Default reference data file
pub const DEFAULT_REFERENCE_DATA_PATH: &str = "reference_data.yaml";

// ============================================================================
// BATCH CONSTANTS
// ============================================================================

/// Records processed concurrently by a batch
pub const DEFAULT_BATCH_CONCURRENCY: usize = 8;

// ============================================================================
// PRODUCT CATALOG CONSTANTS
// ============================================================================

/// Tax rate for descriptions no keyword matches
pub const CATALOG_DEFAULT_TAX_RATE: &str = "0.06";

/// Tax category for descriptions no keyword matches
pub const CATALOG_DEFAULT_TAX_CATEGORY: &str = "增值税";

/// Category code for descriptions no keyword matches
pub const CATALOG_DEFAULT_CATEGORY_CODE: &str = "OTHER";

/// Function name for configured named queries
pub const NAMED_QUERY_FUNCTION: &str = "db_query";
