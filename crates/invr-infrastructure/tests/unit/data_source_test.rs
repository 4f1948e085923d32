//! Reference data and lookup cache tests

use crate::test_utils::{REFERENCE_YAML, write};
use async_trait::async_trait;
use invr_domain::error::{Error, Result};
use invr_domain::ports::DataSource;
use invr_domain::value::{Row, Value};
use invr_domain::value_objects::{ConditionValue, QueryCondition, QueryDescriptor, QueryOperator};
use invr_infrastructure::data::{CachedDataSource, InMemoryDataSource, ReferenceData};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

fn source() -> InMemoryDataSource {
    let data = ReferenceData::parse(REFERENCE_YAML, "inline").unwrap();
    InMemoryDataSource::new(data.tables)
}

fn tax_number_of(name: &str) -> QueryDescriptor {
    QueryDescriptor::new("companies", Some("tax_number".to_string()))
        .with_condition(QueryCondition::eq("name", name))
}

#[tokio::test]
async fn test_lookup_by_equality() {
    let row = source().lookup(&tax_number_of("Globex")).await.unwrap().unwrap();
    assert_eq!(row.get("tax_number"), Some(&Value::from("91110108MA01W8XL6K")));

    assert!(source().lookup(&tax_number_of("Nobody")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_range_lookup() {
    let query = QueryDescriptor::new("tax_rates", Some("rate".to_string()))
        .with_condition(QueryCondition::eq("category", "TRAVEL_SERVICE"))
        .with_condition(QueryCondition::new(
            "min_amount",
            QueryOperator::Le,
            ConditionValue::Single(Value::from(15000)),
        ))
        .with_condition(QueryCondition::new(
            "max_amount",
            QueryOperator::Ge,
            ConditionValue::Single(Value::from(15000)),
        ));
    let row = source().lookup(&query).await.unwrap().unwrap();
    assert_eq!(query.project(&row).to_string(), "0.06");
}

#[tokio::test]
async fn test_unknown_table_is_an_error() {
    let query = QueryDescriptor::new("suppliers", None);
    assert!(source().lookup(&query).await.is_err());
}

#[tokio::test]
async fn test_missing_reference_file_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let data = ReferenceData::load(&temp_dir.path().join("none.yaml"))
        .await
        .unwrap();
    assert!(data.tables.is_empty());
    assert!(data.products.is_none());
}

#[tokio::test]
async fn test_reference_file_is_loaded() {
    let temp_dir = TempDir::new().unwrap();
    let path = write(temp_dir.path(), "reference.yaml", REFERENCE_YAML);
    let data = ReferenceData::load(&path).await.unwrap();
    assert_eq!(data.tables["companies"].len(), 2);
    assert_eq!(data.queries.len(), 2);

    let broken = write(temp_dir.path(), "broken.yaml", "tables: [");
    assert!(ReferenceData::load(&broken).await.is_err());
}

#[derive(Default)]
struct CountingSource {
    inner: InMemoryDataSource,
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl DataSource for CountingSource {
    async fn lookup(&self, query: &QueryDescriptor) -> Result<Option<Row>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::lookup("connection refused"));
        }
        self.inner.lookup(query).await
    }
}

#[tokio::test]
async fn test_cache_serves_repeated_hits() {
    let counting = Arc::new(CountingSource {
        inner: source(),
        ..CountingSource::default()
    });
    let cached = CachedDataSource::new(counting.clone());

    for _ in 0..3 {
        let row = cached.lookup(&tax_number_of("Acme Co")).await.unwrap();
        assert!(row.is_some());
    }
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    assert_eq!(cached.entry_count().await, 1);

    cached.clear().await;
    cached.lookup(&tax_number_of("Acme Co")).await.unwrap();
    assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cache_skips_misses_and_errors() {
    let counting = Arc::new(CountingSource {
        inner: source(),
        ..CountingSource::default()
    });
    let cached = CachedDataSource::new(counting.clone());
    cached.lookup(&tax_number_of("Nobody")).await.unwrap();
    cached.lookup(&tax_number_of("Nobody")).await.unwrap();
    assert_eq!(counting.calls.load(Ordering::SeqCst), 2);

    let failing = Arc::new(CountingSource {
        fail: true,
        ..CountingSource::default()
    });
    let cached = CachedDataSource::new(failing.clone());
    assert!(cached.lookup(&tax_number_of("Acme Co")).await.is_err());
    assert!(cached.lookup(&tax_number_of("Acme Co")).await.is_err());
    assert_eq!(failing.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cache_entries_expire() {
    let counting = Arc::new(CountingSource {
        inner: source(),
        ..CountingSource::default()
    });
    let cached = CachedDataSource::with_config(counting.clone(), 10, Duration::from_millis(50));
    cached.lookup(&tax_number_of("Acme Co")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;
    cached.lookup(&tax_number_of("Acme Co")).await.unwrap();
    assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
}
