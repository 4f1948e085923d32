//! Configuration Loader Tests

use invr_infrastructure::config::loader::{ConfigBuilder, ConfigLoader, validate_app_config};
use invr_infrastructure::config::AppConfig;
use invr_infrastructure::constants::{DEFAULT_BATCH_CONCURRENCY, DEFAULT_LOG_LEVEL};
use invr_domain::value::Value;
use invr_engine::MergeStrategy;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_config_loader_default() {
    let temp_dir = TempDir::new().unwrap();
    let config = ConfigLoader::new()
        .with_config_path(temp_dir.path().join("missing.toml"))
        .with_env_prefix("INVR_TEST_DEFAULT")
        .load()
        .unwrap();

    assert_eq!(config.logging.level, DEFAULT_LOG_LEVEL);
    assert_eq!(config.batch.concurrency, DEFAULT_BATCH_CONCURRENCY);
    assert_eq!(config.smart_query.lookup_timeout_ms, 2000);
    assert!(!config.rules.watch);
}

#[test]
fn test_config_builder() {
    let config = ConfigBuilder::new()
        .with_rules_path("/srv/rules")
        .with_rule_watch(true)
        .with_batch_concurrency(2)
        .build();

    assert_eq!(config.rules.path, PathBuf::from("/srv/rules"));
    assert!(config.rules.watch);
    assert_eq!(config.batch.concurrency, 2);
}

#[test]
fn test_config_save_load() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("invr.toml");

    let loader = ConfigLoader::new();
    let original = ConfigBuilder::new()
        .with_rules_path("/srv/rules")
        .with_batch_concurrency(3)
        .build();
    loader.save_to_file(&original, &config_path).unwrap();

    let loaded = ConfigLoader::new()
        .with_config_path(&config_path)
        .with_env_prefix("INVR_TEST_SAVE")
        .load()
        .unwrap();

    assert_eq!(loaded.batch.concurrency, 3);
    assert_eq!(loaded.rules.path, PathBuf::from("/srv/rules"));
}

#[test]
fn test_relative_paths_resolve_against_config_dir() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("invr.toml");
    std::fs::write(
        &config_path,
        "[rules]\npath = \"rules\"\n\n[reference_data]\npath = \"data/reference.yaml\"\n",
    )
    .unwrap();

    let config = ConfigLoader::new()
        .with_config_path(&config_path)
        .with_env_prefix("INVR_TEST_RELATIVE")
        .load()
        .unwrap();

    assert_eq!(config.rules.path, temp_dir.path().join("rules"));
    assert_eq!(
        config.reference_data.path,
        temp_dir.path().join("data/reference.yaml")
    );
}

#[test]
fn test_field_defaults_from_toml() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("invr.toml");
    std::fs::write(
        &config_path,
        "[smart_query.field_defaults]\ncategory = \"UNCLASSIFIED\"\n\"tax_rates.rate\" = 0.09\n",
    )
    .unwrap();

    let config = ConfigLoader::new()
        .with_config_path(&config_path)
        .with_env_prefix("INVR_TEST_DEFAULTS")
        .load()
        .unwrap();

    assert_eq!(
        config.smart_query.field_defaults.get("category"),
        Some(&Value::from("UNCLASSIFIED"))
    );
    assert_eq!(
        config
            .smart_query
            .field_defaults
            .get("tax_rates.rate")
            .and_then(Value::as_decimal)
            .map(|d| d.to_string()),
        Some("0.09".to_string())
    );
}

#[test]
fn test_invalid_values_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("invr.toml");
    std::fs::write(&config_path, "[batch]\nconcurrency = 0\n").unwrap();

    let result = ConfigLoader::new()
        .with_config_path(&config_path)
        .with_env_prefix("INVR_TEST_INVALID")
        .load();
    assert!(result.is_err());

    let mut config = AppConfig::default();
    config.smart_query.lookup_timeout_ms = 0;
    assert!(validate_app_config(&config).is_err());

    let mut config = AppConfig::default();
    config.logging.level = "loud".to_string();
    assert!(validate_app_config(&config).is_err());

    let mut config = AppConfig::default();
    config.smart_query.cache_enabled = false;
    config.smart_query.cache_ttl_secs = 0;
    assert!(validate_app_config(&config).is_ok());
}

#[test]
fn test_merge_settings_from_toml() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("invr.toml");
    std::fs::write(
        &config_path,
        r#"
[batch]
merge_strategy = "by_customer"
merge_keys = ["currency"]
max_items_per_invoice = 8
"#,
    )
    .unwrap();

    let config = ConfigLoader::new()
        .with_config_path(&config_path)
        .with_env_prefix("INVR_TEST_MERGE")
        .load()
        .unwrap();

    assert_eq!(config.batch.merge_strategy, MergeStrategy::ByCustomer);
    assert_eq!(config.batch.merge_keys, vec!["currency".to_string()]);
    let plan = config.batch.merge_plan().unwrap();
    assert_eq!(plan.strategy(), MergeStrategy::ByCustomer);
    assert_eq!(plan.max_items(), Some(8));
    assert!(!plan.is_noop());
}

#[test]
fn test_unusable_merge_settings_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("invr.toml");
    std::fs::write(&config_path, "[batch]\nmerge_strategy = \"by_tax_party\"\n").unwrap();
    let result = ConfigLoader::new()
        .with_config_path(&config_path)
        .with_env_prefix("INVR_TEST_MERGE_UNKNOWN")
        .load();
    assert!(result.is_err());

    let mut config = AppConfig::default();
    config.batch.merge_strategy = MergeStrategy::Custom;
    assert!(validate_app_config(&config).is_err());
    config.batch.merge_keys = vec!["extensions.project".to_string()];
    assert!(validate_app_config(&config).is_ok());

    let mut config = AppConfig::default();
    config.batch.max_items_per_invoice = Some(0);
    assert!(validate_app_config(&config).is_err());

    assert!(AppConfig::default().batch.merge_plan().unwrap().is_noop());
}
