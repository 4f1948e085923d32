//! Shared fixtures: in-memory data sources and a scripted function host

#![allow(dead_code)]

use async_trait::async_trait;
use invr_domain::error::{Error, Result};
use invr_domain::ports::{DataSource, FunctionHost};
use invr_domain::value::{Row, Value};
use invr_domain::value_objects::QueryDescriptor;
use invr_domain::{Invoice, InvoiceItem};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

pub fn dec(text: &str) -> Decimal {
    text.parse().unwrap()
}

/// Tables held in memory; counts lookups
#[derive(Default)]
pub struct TableSource {
    tables: BTreeMap<String, Vec<Row>>,
    pub lookups: AtomicUsize,
}

impl TableSource {
    pub fn with_table(mut self, name: &str, rows: Vec<Row>) -> Self {
        self.tables.insert(name.to_string(), rows);
        self
    }

    pub fn companies() -> Self {
        Self::default().with_table(
            "companies",
            vec![
                row(&[
                    ("name", Value::from("Acme Co")),
                    ("tax_number", Value::from("123")),
                    ("category", Value::from("MANUFACTURING")),
                ]),
                row(&[
                    ("name", Value::from("Globex")),
                    ("tax_number", Value::from("456")),
                    ("category", Value::from("SERVICES")),
                ]),
            ],
        )
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for TableSource {
    async fn lookup(&self, query: &QueryDescriptor) -> Result<Option<Row>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .tables
            .get(&query.table)
            .and_then(|rows| query.select(rows))
            .cloned())
    }
}

/// Never answers within any reasonable timeout
pub struct SlowSource;

#[async_trait]
impl DataSource for SlowSource {
    async fn lookup(&self, _query: &QueryDescriptor) -> Result<Option<Row>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(None)
    }
}

/// Always fails
pub struct FailingSource;

#[async_trait]
impl DataSource for FailingSource {
    async fn lookup(&self, _query: &QueryDescriptor) -> Result<Option<Row>> {
        Err(Error::lookup("connection refused"))
    }
}

/// Function host with a few scripted functions
///
/// - `tax_rate_for(name)` returns 0.13 for names containing "住", else 0.06
/// - `slow()` sleeps for an hour
/// - `broken()` always fails
/// - `echo(x)` returns its argument
#[derive(Default)]
pub struct ScriptedFunctions {
    pub calls: AtomicUsize,
}

#[async_trait]
impl FunctionHost for ScriptedFunctions {
    fn has_function(&self, name: &str) -> bool {
        matches!(name, "tax_rate_for" | "slow" | "broken" | "echo")
    }

    async fn call(&self, name: &str, args: &[Value], _context: &Value) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match name {
            "tax_rate_for" => {
                let text = args.first().map(Value::to_plain_string).unwrap_or_default();
                Ok(Value::from(if text.contains('住') { dec("0.13") } else { dec("0.06") }))
            }
            "slow" => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Value::Null)
            }
            "echo" => Ok(args.first().cloned().unwrap_or_default()),
            _ => Err(Error::internal(format!("{name} is broken"))),
        }
    }

    fn default_value(&self, name: &str) -> Value {
        match name {
            "tax_rate_for" => Value::from(dec("0.06")),
            _ => Value::from("DEFAULT"),
        }
    }
}

pub fn scripted() -> Arc<ScriptedFunctions> {
    Arc::new(ScriptedFunctions::default())
}

pub fn item(description: &str, amount: &str) -> InvoiceItem {
    InvoiceItem {
        description: Some(description.to_string()),
        amount: Some(dec(amount)),
        ..InvoiceItem::default()
    }
}

pub fn invoice_with_items(items: Vec<InvoiceItem>) -> Invoice {
    Invoice {
        items,
        ..Invoice::new("INV-001")
    }
}
