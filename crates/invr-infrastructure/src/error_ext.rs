//! Context helpers for foreign errors
//!
//! `serde_yaml`, `figment`, `notify` and `std::io` errors all cross into the
//! domain [`Error`] through [`ErrorContext`], each picking the variant that
//! matches the operation that failed.
//!
//! ```ignore
//! use invr_infrastructure::error_ext::ErrorContext;
//!
//! let text = std::fs::read_to_string(&path)
//!     .io_context(format!("Failed to read rule file: {}", path.display()))?;
//! let file: RuleFile = serde_yaml::from_str(&text)
//!     .rule_context(format!("Invalid rule file: {}", path.display()))?;
//! ```

use invr_domain::error::{Error, Result};
use std::fmt::Display;

type Source = Box<dyn std::error::Error + Send + Sync>;

/// Domain variant a foreign error is wrapped into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Infrastructure,
    Io,
    Configuration,
    RuleLoad,
}

impl ErrorKind {
    fn wrap(self, message: String, source: Source) -> Error {
        let source = Some(source);
        match self {
            Self::Infrastructure => Error::Infrastructure { message, source },
            Self::Io => Error::Io { message, source },
            Self::Configuration => Error::Configuration { message, source },
            Self::RuleLoad => Error::RuleLoad { message, source },
        }
    }
}

/// Attach a message to a foreign error while converting it
pub trait ErrorContext<T>: Sized {
    /// Wrap the error as `kind`, prefixing its text with `context`
    fn context_as(self, kind: ErrorKind, context: impl Display) -> Result<T>;

    /// Like [`ErrorContext::context`], building the message only on failure
    fn with_context<C: Display>(self, f: impl FnOnce() -> C) -> Result<T>;

    fn context(self, context: impl Display) -> Result<T> {
        self.context_as(ErrorKind::Infrastructure, context)
    }

    fn io_context(self, context: impl Display) -> Result<T> {
        self.context_as(ErrorKind::Io, context)
    }

    fn config_context(self, context: impl Display) -> Result<T> {
        self.context_as(ErrorKind::Configuration, context)
    }

    fn rule_context(self, context: impl Display) -> Result<T> {
        self.context_as(ErrorKind::RuleLoad, context)
    }
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context_as(self, kind: ErrorKind, context: impl Display) -> Result<T> {
        self.map_err(|err| kind.wrap(format!("{context}: {err}"), Box::new(err)))
    }

    fn with_context<C: Display>(self, f: impl FnOnce() -> C) -> Result<T> {
        self.map_err(|err| ErrorKind::Infrastructure.wrap(format!("{}: {err}", f()), Box::new(err)))
    }
}
