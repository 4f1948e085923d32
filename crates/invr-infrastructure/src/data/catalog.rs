//! Product catalog functions
//!
//! Serves `get_standard_name`, `get_tax_rate`, `get_tax_category`,
//! `get_category_code` and `get_product_info` for item descriptions. Keyword
//! entries are tried first (substring match, declaration order), then the
//! catalog entries; a description nothing matches keeps its own text as the
//! standard name and gets the default rate and category.

use crate::constants::{
    CATALOG_DEFAULT_CATEGORY_CODE, CATALOG_DEFAULT_TAX_CATEGORY, CATALOG_DEFAULT_TAX_RATE,
};
use async_trait::async_trait;
use invr_domain::error::{Error, Result};
use invr_domain::ports::FunctionHost;
use invr_domain::value::{Row, Value, parse_decimal};
use serde::Deserialize;

/// Functions served by [`ProductCatalog`]
pub const CATALOG_FUNCTIONS: &[&str] = &[
    "get_standard_name",
    "get_tax_rate",
    "get_tax_category",
    "get_category_code",
    "get_product_info",
];

/// One catalog entry, matched when the description contains `keyword`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProductEntry {
    pub keyword: String,
    pub standard_name: String,
    pub tax_rate: Value,
    pub tax_category: String,
    pub category_code: String,
}

impl ProductEntry {
    fn new(
        keyword: &str,
        standard_name: &str,
        tax_rate: &str,
        tax_category: &str,
        category_code: &str,
    ) -> Self {
        Self {
            keyword: keyword.to_string(),
            standard_name: standard_name.to_string(),
            tax_rate: parse_decimal(tax_rate).map_or(Value::Null, Value::Number),
            tax_category: tax_category.to_string(),
            category_code: category_code.to_string(),
        }
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("standard_name".into(), Value::from(self.standard_name.as_str()));
        row.insert("tax_rate".into(), self.tax_rate.clone());
        row.insert("tax_category".into(), Value::from(self.tax_category.as_str()));
        row.insert("category_code".into(), Value::from(self.category_code.as_str()));
        row
    }
}

/// `products` section of the reference data file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Preferred matches
    pub keywords: Vec<ProductEntry>,
    /// Secondary matches, compared case-insensitively
    pub catalog: Vec<ProductEntry>,
}

/// Keyword-driven product information host
#[derive(Debug, Clone)]
pub struct ProductCatalog {
    keywords: Vec<ProductEntry>,
    catalog: Vec<ProductEntry>,
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProductCatalog {
    pub fn new(config: CatalogConfig) -> Result<Self> {
        for entry in config.keywords.iter().chain(&config.catalog) {
            if entry.keyword.is_empty() {
                return Err(Error::configuration("product entry with empty keyword"));
            }
            if entry.tax_rate.as_decimal().is_none() {
                return Err(Error::configuration(format!(
                    "product '{}' has a non-numeric tax_rate",
                    entry.keyword
                )));
            }
        }
        Ok(Self {
            keywords: config.keywords,
            catalog: config.catalog,
        })
    }

    /// Catalog used when the reference data declares none
    pub fn builtin() -> Self {
        Self {
            keywords: vec![
                ProductEntry::new("住", "住宿费", "0.13", "增值税专票", "ACCOMMODATION"),
                ProductEntry::new("餐", "餐饮", "0.06", "增值税普票", "CATERING"),
                ProductEntry::new("停车", "停车费", "0.09", "不动产租赁", "PARKING"),
            ],
            catalog: vec![
                ProductEntry::new("住房", "住宿费", "0.06", "增值税", "ACCOMMODATION"),
                ProductEntry::new("餐饮", "餐费", "0.06", "增值税", "CATERING"),
                ProductEntry::new("交通", "交通费", "0.09", "增值税", "TRANSPORTATION"),
                ProductEntry::new("停车", "停车费", "0.06", "增值税", "PARKING"),
                ProductEntry::new("会议", "会议费", "0.06", "增值税", "CONFERENCE"),
                ProductEntry::new("培训", "培训费", "0.06", "增值税", "TRAINING"),
            ],
        }
    }

    /// Product information for a description
    pub fn product_info(&self, description: &str) -> Row {
        if let Some(entry) = self.keywords.iter().find(|e| description.contains(&e.keyword)) {
            return entry.to_row();
        }
        let lowered = description.to_lowercase();
        if let Some(entry) = self
            .catalog
            .iter()
            .find(|e| lowered.contains(&e.keyword.to_lowercase()))
        {
            return entry.to_row();
        }
        ProductEntry::new(
            "",
            description,
            CATALOG_DEFAULT_TAX_RATE,
            CATALOG_DEFAULT_TAX_CATEGORY,
            CATALOG_DEFAULT_CATEGORY_CODE,
        )
        .to_row()
    }
}

#[async_trait]
impl FunctionHost for ProductCatalog {
    fn has_function(&self, name: &str) -> bool {
        CATALOG_FUNCTIONS.contains(&name)
    }

    async fn call(&self, name: &str, args: &[Value], _context: &Value) -> Result<Value> {
        let description = match args.first() {
            Some(Value::String(s)) => s.as_str(),
            Some(other) => {
                return Err(Error::invalid_argument(format!(
                    "{name} expects a description string, got {}",
                    other.type_name()
                )));
            }
            None => return Err(Error::invalid_argument(format!("{name} expects a description"))),
        };
        let mut info = self.product_info(description);
        let field = match name {
            "get_standard_name" => "standard_name",
            "get_tax_rate" => "tax_rate",
            "get_tax_category" => "tax_category",
            "get_category_code" => "category_code",
            "get_product_info" => return Ok(Value::Map(info)),
            other => return Err(Error::not_found(format!("function '{other}'"))),
        };
        Ok(info.remove(field).unwrap_or(Value::Null))
    }

    fn default_value(&self, name: &str) -> Value {
        match name {
            "get_tax_rate" => {
                parse_decimal(CATALOG_DEFAULT_TAX_RATE).map_or(Value::Null, Value::Number)
            }
            "get_tax_category" => Value::from(CATALOG_DEFAULT_TAX_CATEGORY),
            "get_category_code" => Value::from(CATALOG_DEFAULT_CATEGORY_CODE),
            "get_standard_name" => Value::from(""),
            _ => Value::Null,
        }
    }
}
