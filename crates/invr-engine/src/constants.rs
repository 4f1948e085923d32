//! Engine constants

use std::time::Duration;

// ============================================================================
// TIMEOUTS
// ============================================================================

/// Budget for a single reference-data lookup
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_millis(2000);

/// Budget for a single auxiliary function call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_millis(2000);

// ============================================================================
// BATCH CONSTANTS
// ============================================================================

/// Records processed concurrently by a batch when not configured
pub const DEFAULT_BATCH_CONCURRENCY: usize = 8;

/// Decimal places of amounts shared out when a record is split
pub const AMOUNT_SCALE: u32 = 2;

// ============================================================================
// EXPRESSION CONSTANTS
// ============================================================================

/// Functions and macros understood by the evaluator itself
///
/// Auxiliary hosts cannot shadow these names.
pub const BUILTIN_FUNCTIONS: &[&str] = &[
    "has",
    "size",
    "contains",
    "startsWith",
    "endsWith",
    "matches",
    "lowerAscii",
    "upperAscii",
    "trim",
    "string",
    "int",
    "double",
    "decimal",
    "round",
    "abs",
    "min",
    "max",
    "sum",
    "all",
    "exists",
    "exists_one",
    "filter",
    "map",
];

/// Builtins that bind a variable for their body (`items.all(i, ...)`)
pub const COMPREHENSIONS: &[&str] = &["all", "exists", "exists_one", "filter", "map"];

/// Prefix of the synthesized message for a validation rule that raised
pub const RULE_ERROR_PREFIX: &str = "Rule execution error";

/// Maximum number of parsed expressions kept by the evaluator
pub const PARSE_CACHE_CAPACITY: usize = 4096;

/// Maximum number of compiled `matches()` patterns kept by the evaluator
pub const REGEX_CACHE_CAPACITY: u64 = 256;
