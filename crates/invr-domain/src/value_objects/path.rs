//! Field paths addressing a record
//!
//! A target is either a dotted scalar path (`supplier.tax_no`,
//! `extensions.region`) or a collection path (`items[].tax_rate`) that is
//! applied to every element of the collection.

use crate::constants::{COLLECTION_MARKER, RECORD_ALIAS};
use crate::error::{Error, Result};
use std::fmt;

/// Parsed field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    /// Dotted path from the record root
    Scalar(Vec<String>),
    /// Path applied inside every element of a collection
    Collection {
        /// Collection field on the record (e.g. `items`)
        collection: String,
        /// Path inside each element; empty means the element itself
        field: Vec<String>,
    },
}

impl FieldPath {
    /// Parse a path, tolerating a leading `invoice.` prefix
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_argument("field path is empty"));
        }
        let trimmed = trimmed
            .strip_prefix(RECORD_ALIAS)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(trimmed);

        if let Some((collection, rest)) = trimmed.split_once(COLLECTION_MARKER) {
            let collection = collection.trim();
            validate_segment(collection, raw)?;
            let field = match rest.strip_prefix('.') {
                Some(rest) => split_segments(rest, raw)?,
                None if rest.is_empty() => Vec::new(),
                None => {
                    return Err(Error::invalid_argument(format!(
                        "unexpected text after '[]' in path '{raw}'"
                    )));
                }
            };
            if field.iter().any(|s| s.contains(COLLECTION_MARKER)) {
                return Err(Error::invalid_argument(format!(
                    "nested collection paths are not supported: '{raw}'"
                )));
            }
            return Ok(Self::Collection {
                collection: collection.to_string(),
                field,
            });
        }

        Ok(Self::Scalar(split_segments(trimmed, raw)?))
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Collection { .. })
    }

    /// Segments of a scalar path, empty for collection paths
    pub fn segments(&self) -> &[String] {
        match self {
            Self::Scalar(segments) => segments,
            Self::Collection { .. } => &[],
        }
    }
}

fn split_segments(path: &str, raw: &str) -> Result<Vec<String>> {
    path.split('.')
        .map(|segment| {
            let segment = segment.trim();
            validate_segment(segment, raw)?;
            Ok(segment.to_string())
        })
        .collect()
}

fn validate_segment(segment: &str, raw: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(Error::invalid_argument(format!(
            "empty segment in path '{raw}'"
        )));
    }
    Ok(())
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(segments) => write!(f, "{}", segments.join(".")),
            Self::Collection { collection, field } if field.is_empty() => {
                write!(f, "{collection}{COLLECTION_MARKER}")
            }
            Self::Collection { collection, field } => {
                write!(f, "{collection}{COLLECTION_MARKER}.{}", field.join("."))
            }
        }
    }
}
