//! Product catalog tests

use invr_domain::ports::FunctionHost;
use invr_domain::value::Value;
use invr_infrastructure::data::{CatalogConfig, ProductCatalog};

async fn call(catalog: &ProductCatalog, name: &str, description: &str) -> Value {
    catalog
        .call(name, &[Value::from(description)], &Value::Null)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_keyword_match_wins() {
    let catalog = ProductCatalog::builtin();
    assert_eq!(call(&catalog, "get_tax_rate", "住宿费 2晚").await.to_string(), "0.13");
    assert_eq!(
        call(&catalog, "get_standard_name", "商务餐").await,
        Value::from("餐饮")
    );
    // the keyword entry for 停车 shadows the catalog entry
    assert_eq!(call(&catalog, "get_tax_rate", "停车").await.to_string(), "0.09");
    assert_eq!(
        call(&catalog, "get_category_code", "停车").await,
        Value::from("PARKING")
    );
}

#[tokio::test]
async fn test_catalog_fallback_and_default() {
    let catalog = ProductCatalog::builtin();
    assert_eq!(
        call(&catalog, "get_category_code", "高铁交通").await,
        Value::from("TRANSPORTATION")
    );
    assert_eq!(
        call(&catalog, "get_standard_name", "办公用品").await,
        Value::from("办公用品")
    );
    assert_eq!(call(&catalog, "get_tax_rate", "办公用品").await.to_string(), "0.06");
    assert_eq!(
        call(&catalog, "get_tax_category", "办公用品").await,
        Value::from("增值税")
    );
}

#[tokio::test]
async fn test_product_info_is_a_map() {
    let catalog = ProductCatalog::builtin();
    let info = call(&catalog, "get_product_info", "会议室租用").await;
    let map = info.as_map().unwrap();
    assert_eq!(map.get("category_code"), Some(&Value::from("CONFERENCE")));
    assert_eq!(map.len(), 4);
}

#[tokio::test]
async fn test_bad_arguments_are_errors() {
    let catalog = ProductCatalog::builtin();
    assert!(catalog.call("get_tax_rate", &[], &Value::Null).await.is_err());
    assert!(
        catalog
            .call("get_tax_rate", &[Value::from(3)], &Value::Null)
            .await
            .is_err()
    );
    assert!(!catalog.has_function("get_weather"));
    assert_eq!(catalog.default_value("get_tax_rate").to_string(), "0.06");
}

#[tokio::test]
async fn test_configured_catalog() {
    let config: CatalogConfig = serde_yaml::from_str(
        r#"
keywords:
  - { keyword: 软件, standard_name: 软件服务, tax_rate: 0.06, tax_category: 增值税专票, category_code: SOFTWARE }
"#,
    )
    .unwrap();
    let catalog = ProductCatalog::new(config).unwrap();
    assert_eq!(
        call(&catalog, "get_category_code", "软件许可").await,
        Value::from("SOFTWARE")
    );
    // built-in entries are not merged into a configured catalog
    assert_eq!(
        call(&catalog, "get_category_code", "住宿").await,
        Value::from("OTHER")
    );

    let bad: CatalogConfig = serde_yaml::from_str(
        "keywords:\n  - { keyword: x, standard_name: X, tax_rate: high, tax_category: c, category_code: C }\n",
    )
    .unwrap();
    assert!(ProductCatalog::new(bad).is_err());
}
