//! Evaluation errors

use thiserror::Error;

/// Error raised while parsing or evaluating an expression
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// Expression text is malformed
    #[error("syntax error at offset {position}: {message}")]
    Syntax {
        /// What was expected or found
        message: String,
        /// Byte offset into the expression
        position: usize,
    },

    /// Operands have incompatible types
    #[error("type mismatch: {message}")]
    TypeMismatch {
        /// Description of the mismatch
        message: String,
    },

    /// A field or variable does not exist
    #[error("path not found: {path}")]
    PathNotFound {
        /// Path that could not be resolved
        path: String,
    },

    /// Function name is not known
    #[error("unknown function: {name}")]
    UnknownFunction {
        /// Name of the function
        name: String,
    },

    /// Division or remainder by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Any other evaluation failure (bad arguments, overflow, invalid regex)
    #[error("evaluation error: {message}")]
    Eval {
        /// Description of the failure
        message: String,
    },
}

impl EvalError {
    pub fn syntax<S: Into<String>>(message: S, position: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            position,
        }
    }

    pub fn type_mismatch<S: Into<String>>(message: S) -> Self {
        Self::TypeMismatch {
            message: message.into(),
        }
    }

    pub fn path_not_found<S: Into<String>>(path: S) -> Self {
        Self::PathNotFound { path: path.into() }
    }

    pub fn eval<S: Into<String>>(message: S) -> Self {
        Self::Eval {
            message: message.into(),
        }
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }
}

/// Result type for expression operations
pub type EvalResult<T> = std::result::Result<T, EvalError>;
