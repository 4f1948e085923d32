//! Error type shared by every invoice rule engine crate
//!
//! Expression failures inside a rule never surface here: the engine records
//! them in the trace and moves on. These errors are for loading rules and
//! configuration, and for the adapters behind the ports.

use thiserror::Error;

/// Result alias used across the workspace
pub type Result<T> = std::result::Result<T, Error>;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum Error {
    /// Reading or writing a file failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Record or payload JSON could not be decoded
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Named thing (function, query, table) does not exist
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Caller passed a value of the wrong shape
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// A rule breaks a structural invariant (missing target, bad path, ...)
    #[error("Invalid rule '{rule_id}': {message}")]
    InvalidRule { rule_id: String, message: String },

    /// Rule files could not be read or parsed into a rule set
    #[error("Rule load error: {message}")]
    RuleLoad {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// A reference-data lookup failed (as opposed to matching nothing)
    #[error("Lookup error: {message}")]
    Lookup { message: String },

    /// A lookup or auxiliary call ran past its budget
    #[error("{operation} timed out after {millis}ms")]
    Timeout { operation: String, millis: u64 },

    /// Configuration is unreadable or holds invalid values
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// An adapter failed for a reason with no better variant
    #[error("Infrastructure error: {message}")]
    Infrastructure {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl Error {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn invalid_rule(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRule {
            rule_id: rule_id.into(),
            message: message.into(),
        }
    }

    pub fn rule_load(message: impl Into<String>) -> Self {
        Self::RuleLoad {
            message: message.into(),
            source: None,
        }
    }

    pub fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, millis: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            millis,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
