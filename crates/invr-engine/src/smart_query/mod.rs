//! Smart queries
//!
//! A smart query is a structured lookup embedded in rule text:
//! `db.companies.tax_number[name=$supplier.name]`. The parser locates and
//! parses references; the executor resolves their condition values against
//! the evaluation scope and asks the configured [`DataSource`] for the row.
//!
//! [`DataSource`]: invr_domain::ports::DataSource

pub mod executor;
pub mod parser;

pub use executor::{FieldDefaults, Resolution, SmartQueryEngine, millis};
pub use parser::{
    ConditionSpec, Located, Operand, SmartQuery, ValueRef, find_queries, parse_condition,
    parse_conditions,
};
