//! Domain layer constants

// ============================================================================
// RULE CONSTANTS
// ============================================================================

/// Priority assigned to rules that do not declare one
pub const DEFAULT_RULE_PRIORITY: i32 = 100;

/// Name under which the whole record is bound in expressions
pub const RECORD_ALIAS: &str = "invoice";

/// Name under which the current collection element is bound in expressions
pub const ITEM_BINDING: &str = "item";

/// Suffix marking a collection target path (`items[].field`)
pub const COLLECTION_MARKER: &str = "[]";

// ============================================================================
// TRACE REASONS
// ============================================================================

/// Gating condition evaluated to false
pub const REASON_CONDITION_NOT_MET: &str = "condition_not_met";

/// Fill-only rule found the target already populated
pub const REASON_TARGET_ALREADY_SET: &str = "target_already_set";

/// Rule expression produced null, nothing written
pub const REASON_NULL_RESULT: &str = "null_result";

/// Collection had no elements to process
pub const REASON_EMPTY_COLLECTION: &str = "empty_collection";

/// Pass was cancelled before this rule ran
pub const REASON_CANCELLED: &str = "cancelled";

// ============================================================================
// LOOKUP DEFAULTS
// ============================================================================

/// Fallback for tax number lookups
pub const DEFAULT_TAX_NUMBER: &str = "";

/// Fallback for name lookups
pub const DEFAULT_NAME: &str = "";

/// Fallback for category lookups
pub const DEFAULT_CATEGORY: &str = "GENERAL";

/// Fallback for tax rate lookups
pub const DEFAULT_TAX_RATE: &str = "0.06";
