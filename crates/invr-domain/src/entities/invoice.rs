//! Invoice record types

use crate::value::{Value, decimal_opt};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Postal address of a party
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

/// Supplier or customer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Party {
    pub name: Option<String>,
    pub tax_no: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub bank_account: Option<String>,
    pub address: Option<Address>,
    /// Fields with no static slot
    pub extra: BTreeMap<String, Value>,
}

/// Invoice line item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceItem {
    pub item_id: Option<String>,
    pub description: Option<String>,
    /// Standardised product name
    pub name: Option<String>,
    pub product_code: Option<String>,
    #[serde(with = "decimal_opt")]
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    #[serde(with = "decimal_opt")]
    pub unit_price: Option<Decimal>,
    #[serde(with = "decimal_opt")]
    pub amount: Option<Decimal>,
    #[serde(with = "decimal_opt")]
    pub tax_rate: Option<Decimal>,
    #[serde(with = "decimal_opt")]
    pub tax_amount: Option<Decimal>,
    pub tax_category: Option<String>,
    pub category_code: Option<String>,
    pub note: Option<String>,
    /// Fields with no static slot
    pub extra: BTreeMap<String, Value>,
}

/// An invoice being completed and validated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Invoice {
    pub invoice_number: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub invoice_type: Option<String>,
    pub country: Option<String>,
    pub currency: Option<String>,
    pub tenant_id: Option<String>,
    pub supplier: Party,
    pub customer: Party,
    pub items: Vec<InvoiceItem>,
    #[serde(with = "decimal_opt")]
    pub total_amount: Option<Decimal>,
    #[serde(with = "decimal_opt")]
    pub tax_amount: Option<Decimal>,
    #[serde(with = "decimal_opt")]
    pub net_amount: Option<Decimal>,
    /// Dynamic namespace written by rules targeting `extensions.*`
    pub extensions: BTreeMap<String, Value>,
}

impl Invoice {
    pub fn new(invoice_number: impl Into<String>) -> Self {
        Self {
            invoice_number: Some(invoice_number.into()),
            ..Self::default()
        }
    }
}
