//! Query descriptors for reference-data lookups
//!
//! A [`QueryDescriptor`] is the structured, already-resolved form of a smart
//! query such as `db.companies.tax_number[name="Acme Co"]`. Data sources match
//! rows against it; conditions are never rendered into query text.

use crate::value::{Row, Value};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Comparison operator of a lookup condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryOperator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    NotIn,
    Like,
    Between,
}

impl QueryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Like => "LIKE",
            Self::Between => "BETWEEN",
        }
    }
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of a condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionValue {
    Single(Value),
    List(Vec<Value>),
    Range(Value, Value),
}

/// A single `field op value` condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryCondition {
    pub field: String,
    pub operator: QueryOperator,
    pub value: ConditionValue,
}

impl QueryCondition {
    pub fn new(field: impl Into<String>, operator: QueryOperator, value: ConditionValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Shorthand for an equality condition
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, QueryOperator::Eq, ConditionValue::Single(value.into()))
    }

    /// Whether `row` satisfies this condition; a missing column never matches
    pub fn matches(&self, row: &Row) -> bool {
        let Some(cell) = row.get(&self.field) else {
            return false;
        };
        match (&self.operator, &self.value) {
            (QueryOperator::Eq, ConditionValue::Single(v)) => loose_eq(cell, v),
            (QueryOperator::Ne, ConditionValue::Single(v)) => !loose_eq(cell, v),
            (QueryOperator::Gt, ConditionValue::Single(v)) => {
                compare(cell, v) == Some(Ordering::Greater)
            }
            (QueryOperator::Ge, ConditionValue::Single(v)) => matches!(
                compare(cell, v),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            (QueryOperator::Lt, ConditionValue::Single(v)) => {
                compare(cell, v) == Some(Ordering::Less)
            }
            (QueryOperator::Le, ConditionValue::Single(v)) => {
                matches!(compare(cell, v), Some(Ordering::Less | Ordering::Equal))
            }
            (QueryOperator::In, ConditionValue::List(vs)) => vs.iter().any(|v| loose_eq(cell, v)),
            (QueryOperator::In, ConditionValue::Single(v)) => loose_eq(cell, v),
            (QueryOperator::NotIn, ConditionValue::List(vs)) => {
                !vs.iter().any(|v| loose_eq(cell, v))
            }
            (QueryOperator::NotIn, ConditionValue::Single(v)) => !loose_eq(cell, v),
            (QueryOperator::Like, ConditionValue::Single(v)) => like(cell, v),
            (QueryOperator::Between, ConditionValue::Range(lo, hi)) => {
                matches!(compare(cell, lo), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(compare(cell, hi), Some(Ordering::Less | Ordering::Equal))
            }
            _ => false,
        }
    }

    /// Whether a `LIKE` condition matches the cell exactly rather than partially
    ///
    /// Non-`LIKE` conditions always count as exact.
    pub fn is_exact(&self, row: &Row) -> bool {
        match (&self.operator, &self.value) {
            (QueryOperator::Like, ConditionValue::Single(v)) => row
                .get(&self.field)
                .is_some_and(|cell| {
                    cell.to_plain_string()
                        .eq_ignore_ascii_case(v.to_plain_string().trim_matches('%'))
                }),
            _ => true,
        }
    }
}

/// Structured lookup: table, optional projected field, conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub table: String,
    /// Projected column; `None` returns the whole row
    pub field: Option<String>,
    pub conditions: Vec<QueryCondition>,
}

impl QueryDescriptor {
    pub fn new(table: impl Into<String>, field: Option<String>) -> Self {
        Self {
            table: table.into(),
            field,
            conditions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_condition(mut self, condition: QueryCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Whether `row` satisfies every condition
    pub fn matches(&self, row: &Row) -> bool {
        self.conditions.iter().all(|c| c.matches(row))
    }

    /// Pick the single answering row
    ///
    /// Rows whose `LIKE` conditions match exactly win over partial matches;
    /// otherwise the first matching row in source order is returned.
    pub fn select<'a, I>(&self, rows: I) -> Option<&'a Row>
    where
        I: IntoIterator<Item = &'a Row>,
    {
        let mut first_partial = None;
        for row in rows {
            if !self.matches(row) {
                continue;
            }
            if self.conditions.iter().all(|c| c.is_exact(row)) {
                return Some(row);
            }
            first_partial.get_or_insert(row);
        }
        first_partial
    }

    /// Project the answering row onto the requested field
    pub fn project(&self, row: &Row) -> Value {
        match &self.field {
            Some(field) => row.get(field).cloned().unwrap_or(Value::Null),
            None => Value::Map(row.clone()),
        }
    }

    /// Stable textual key for caching lookup results
    pub fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for QueryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "db.{}", self.table)?;
        if let Some(field) = &self.field {
            write!(f, ".{field}")?;
        }
        write!(f, "[")?;
        for (i, c) in self.conditions.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {} ", c.field, c.operator)?;
            match &c.value {
                ConditionValue::Single(v) => write!(f, "{}", v.to_json())?,
                ConditionValue::List(vs) => {
                    write!(f, "{}", Value::List(vs.clone()).to_json())?;
                }
                ConditionValue::Range(lo, hi) => {
                    write!(f, "{} AND {}", lo.to_json(), hi.to_json())?;
                }
            }
        }
        write!(f, "]")
    }
}

fn numeric(value: &Value) -> Option<Decimal> {
    value.to_decimal()
}

/// Equality that lets numbers match numeric strings and compares text case-sensitively
fn loose_eq(cell: &Value, value: &Value) -> bool {
    if cell == value {
        return true;
    }
    match (numeric(cell), numeric(value)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn compare(cell: &Value, value: &Value) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (numeric(cell), numeric(value)) {
        return Some(a.cmp(&b));
    }
    match (cell, value) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Case-insensitive SQL-style `LIKE`
///
/// `%` matches any run and `_` any single character. A pattern without
/// wildcards matches as a substring.
fn like(cell: &Value, pattern: &Value) -> bool {
    let text = cell.to_plain_string().to_lowercase();
    let pattern = pattern.to_plain_string().to_lowercase();
    if !pattern.contains(['%', '_']) {
        return text.contains(&pattern);
    }
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    wildcard_match(&text, &pattern)
}

fn wildcard_match(text: &[char], pattern: &[char]) -> bool {
    let (mut t, mut p) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            star = Some((p, t));
            p += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}
