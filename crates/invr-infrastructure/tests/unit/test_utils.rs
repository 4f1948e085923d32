//! Shared fixtures for infrastructure tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};

pub const RULES_YAML: &str = r#"
field_completion_rules:
  - id: default_country
    rule_name: Default country
    apply_to: ""
    target_field: country
    rule_expression: "'CN'"
    priority: 100
  - id: supplier_tax
    rule_name: Supplier tax number
    apply_to: "has(supplier.name) && !has(supplier.tax_no)"
    target_field: supplier.tax_no
    rule_expression: "db.companies.tax_number[name=$supplier.name]"
    priority: 90
  - id: tax_amount
    rule_name: Tax amount
    apply_to: "total_amount > 0 && !has(tax_amount)"
    target_field: tax_amount
    rule_expression: "total_amount * 0.06"
    priority: 80
  - id: item_rate
    rule_name: Item tax rate
    apply_to: "item.amount > 0"
    target_field: "items[].tax_rate"
    rule_expression: "get_tax_rate(item.description)"
    priority: 70
field_validation_rules:
  - id: total_positive
    rule_name: Total positive
    field_path: total_amount
    rule_expression: "total_amount > 0"
    error_message: Total must be positive
  - id: supplier_email
    rule_name: Supplier email
    field_path: supplier.email
    rule_expression: "has(supplier.email)"
    error_message: Supplier email is recommended
    severity: warning
"#;

pub const REFERENCE_YAML: &str = r#"
tables:
  companies:
    - { name: Acme Co, tax_number: "91440101234567890A", category: TRAVEL_SERVICE }
    - { name: Globex, tax_number: "91110108MA01W8XL6K", category: GENERAL }
  tax_rates:
    - { category: TRAVEL_SERVICE, min_amount: 0, max_amount: 10000, rate: 0.03 }
    - { category: TRAVEL_SERVICE, min_amount: 10001, max_amount: 999999, rate: 0.06 }
    - { category: GENERAL, min_amount: 0, max_amount: 999999, rate: 0.13 }
queries:
  get_tax_number_by_name:
    table: companies
    field: tax_number
    conditions:
      - { field: name, param: 0 }
    fallback: ""
  get_tax_rate_by_category_and_amount:
    table: tax_rates
    field: rate
    conditions:
      - { field: category, param: 0 }
      - { field: min_amount, operator: LE, param: 1 }
      - { field: max_amount, operator: GE, param: 1 }
    fallback: 0.06
"#;

/// Write `content` to `dir/name` and return the path
pub fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

/// A single valid completion rule file
pub fn single_rule(id: &str, expression: &str) -> String {
    format!(
        "field_completion_rules:\n  - id: {id}\n    rule_name: {id}\n    target_field: country\n    rule_expression: \"{expression}\"\n"
    )
}
