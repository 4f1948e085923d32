//! Path-based access to typed records
//!
//! Rules address fields by dotted path. Instead of reflecting over struct
//! layouts, every record type carries an explicit accessor table: a `match`
//! on the next path segment that reads or writes the typed slot, falling back
//! to a map-typed bag (`extensions`, `extra`) for fields with no static slot.

use crate::entities::invoice::{Address, Invoice, InvoiceItem, Party};
use crate::error::{Error, Result};
use crate::value::Value;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

/// A record rules can read and mutate by path
pub trait Record: Send + Sync {
    /// Whole record as a value map, used as the expression root scope
    fn to_value(&self) -> Value;

    /// Read a scalar path; `None` when the path does not exist
    fn get_path(&self, path: &[String]) -> Option<Value>;

    /// Write a scalar path, creating entries in dynamic bags as needed
    fn set_path(&mut self, path: &[String], value: Value) -> Result<()>;

    /// Number of elements in a collection field
    fn collection_len(&self, collection: &str) -> Option<usize>;

    /// One collection element as a value
    fn item_value(&self, collection: &str, index: usize) -> Option<Value>;

    /// Write a path inside one collection element
    fn set_item_path(
        &mut self,
        collection: &str,
        index: usize,
        path: &[String],
        value: Value,
    ) -> Result<()>;

    /// Read a path inside one collection element
    fn get_item_path(&self, collection: &str, index: usize, path: &[String]) -> Option<Value> {
        self.item_value(collection, index)
            .and_then(|item| item.get_path(path).cloned())
    }

    /// True when the path exists and holds a non-null value
    fn has_path(&self, path: &[String]) -> bool {
        self.get_path(path).is_some_and(|v| !v.is_null())
    }

    /// Tenant the record belongs to, used to scope tenant-specific rules
    fn tenant_id(&self) -> Option<&str> {
        None
    }
}

/// Accessor table of one nested record type
trait Accessor {
    fn to_value(&self) -> Value;
    fn get(&self, path: &[String]) -> Option<Value>;
    fn set(&mut self, path: &[String], value: Value) -> Result<()>;
}

impl Accessor for Address {
    fn to_value(&self) -> Value {
        let mut map: BTreeMap<String, Value> = BTreeMap::new();
        map.insert("street".into(), self.street.clone().into());
        map.insert("city".into(), self.city.clone().into());
        map.insert("state".into(), self.state.clone().into());
        map.insert("postal_code".into(), self.postal_code.clone().into());
        map.insert("country".into(), self.country.clone().into());
        Value::Map(map)
    }

    fn get(&self, path: &[String]) -> Option<Value> {
        let Some((head, rest)) = path.split_first() else {
            return Some(self.to_value());
        };
        let slot = match head.as_str() {
            "street" => &self.street,
            "city" => &self.city,
            "state" => &self.state,
            "postal_code" => &self.postal_code,
            "country" => &self.country,
            _ => return None,
        };
        leaf(slot.clone().into(), rest)
    }

    fn set(&mut self, path: &[String], value: Value) -> Result<()> {
        let Some((head, rest)) = path.split_first() else {
            *self = from_value(value, "address")?;
            return Ok(());
        };
        let slot = match head.as_str() {
            "street" => &mut self.street,
            "city" => &mut self.city,
            "state" => &mut self.state,
            "postal_code" => &mut self.postal_code,
            "country" => &mut self.country,
            other => return Err(unknown_field("address", other)),
        };
        set_string(slot, rest, value, head)
    }
}

impl Accessor for Party {
    fn to_value(&self) -> Value {
        let mut map: BTreeMap<String, Value> = BTreeMap::new();
        map.insert("name".into(), self.name.clone().into());
        map.insert("tax_no".into(), self.tax_no.clone().into());
        map.insert("email".into(), self.email.clone().into());
        map.insert("phone".into(), self.phone.clone().into());
        map.insert("bank_account".into(), self.bank_account.clone().into());
        map.insert(
            "address".into(),
            self.address.as_ref().map_or(Value::Null, Accessor::to_value),
        );
        map.insert("extra".into(), Value::Map(self.extra.clone()));
        Value::Map(map)
    }

    fn get(&self, path: &[String]) -> Option<Value> {
        let Some((head, rest)) = path.split_first() else {
            return Some(self.to_value());
        };
        match head.as_str() {
            "name" => leaf(self.name.clone().into(), rest),
            "tax_no" => leaf(self.tax_no.clone().into(), rest),
            "email" => leaf(self.email.clone().into(), rest),
            "phone" => leaf(self.phone.clone().into(), rest),
            "bank_account" => leaf(self.bank_account.clone().into(), rest),
            "address" => match &self.address {
                Some(address) => address.get(rest),
                None if rest.is_empty() => Some(Value::Null),
                None => None,
            },
            "extra" => map_get(&self.extra, rest),
            _ => None,
        }
    }

    fn set(&mut self, path: &[String], value: Value) -> Result<()> {
        let Some((head, rest)) = path.split_first() else {
            *self = from_value(value, "party")?;
            return Ok(());
        };
        match head.as_str() {
            "name" => set_string(&mut self.name, rest, value, head),
            "tax_no" => set_string(&mut self.tax_no, rest, value, head),
            "email" => set_string(&mut self.email, rest, value, head),
            "phone" => set_string(&mut self.phone, rest, value, head),
            "bank_account" => set_string(&mut self.bank_account, rest, value, head),
            "address" => {
                if rest.is_empty() && value.is_null() {
                    self.address = None;
                    return Ok(());
                }
                self.address.get_or_insert_with(Address::default).set(rest, value)
            }
            "extra" => map_set(&mut self.extra, rest, value),
            other => Err(unknown_field("party", other)),
        }
    }
}

impl Accessor for InvoiceItem {
    fn to_value(&self) -> Value {
        let mut map: BTreeMap<String, Value> = BTreeMap::new();
        map.insert("item_id".into(), self.item_id.clone().into());
        map.insert("description".into(), self.description.clone().into());
        map.insert("name".into(), self.name.clone().into());
        map.insert("product_code".into(), self.product_code.clone().into());
        map.insert("quantity".into(), self.quantity.into());
        map.insert("unit".into(), self.unit.clone().into());
        map.insert("unit_price".into(), self.unit_price.into());
        map.insert("amount".into(), self.amount.into());
        map.insert("tax_rate".into(), self.tax_rate.into());
        map.insert("tax_amount".into(), self.tax_amount.into());
        map.insert("tax_category".into(), self.tax_category.clone().into());
        map.insert("category_code".into(), self.category_code.clone().into());
        map.insert("note".into(), self.note.clone().into());
        map.insert("extra".into(), Value::Map(self.extra.clone()));
        Value::Map(map)
    }

    fn get(&self, path: &[String]) -> Option<Value> {
        let Some((head, rest)) = path.split_first() else {
            return Some(self.to_value());
        };
        let value: Value = match head.as_str() {
            "item_id" => self.item_id.clone().into(),
            "description" => self.description.clone().into(),
            "name" => self.name.clone().into(),
            "product_code" => self.product_code.clone().into(),
            "quantity" => self.quantity.into(),
            "unit" => self.unit.clone().into(),
            "unit_price" => self.unit_price.into(),
            "amount" => self.amount.into(),
            "tax_rate" => self.tax_rate.into(),
            "tax_amount" => self.tax_amount.into(),
            "tax_category" => self.tax_category.clone().into(),
            "category_code" => self.category_code.clone().into(),
            "note" => self.note.clone().into(),
            "extra" => return map_get(&self.extra, rest),
            _ => return None,
        };
        leaf(value, rest)
    }

    fn set(&mut self, path: &[String], value: Value) -> Result<()> {
        let Some((head, rest)) = path.split_first() else {
            *self = from_value(value, "item")?;
            return Ok(());
        };
        match head.as_str() {
            "item_id" => set_string(&mut self.item_id, rest, value, head),
            "description" => set_string(&mut self.description, rest, value, head),
            "name" => set_string(&mut self.name, rest, value, head),
            "product_code" => set_string(&mut self.product_code, rest, value, head),
            "quantity" => set_decimal(&mut self.quantity, rest, value, head),
            "unit" => set_string(&mut self.unit, rest, value, head),
            "unit_price" => set_decimal(&mut self.unit_price, rest, value, head),
            "amount" => set_decimal(&mut self.amount, rest, value, head),
            "tax_rate" => set_decimal(&mut self.tax_rate, rest, value, head),
            "tax_amount" => set_decimal(&mut self.tax_amount, rest, value, head),
            "tax_category" => set_string(&mut self.tax_category, rest, value, head),
            "category_code" => set_string(&mut self.category_code, rest, value, head),
            "note" => set_string(&mut self.note, rest, value, head),
            "extra" => map_set(&mut self.extra, rest, value),
            other => Err(unknown_field("item", other)),
        }
    }
}

impl Invoice {
    fn items_value(&self) -> Value {
        Value::List(self.items.iter().map(Accessor::to_value).collect())
    }
}

impl Record for Invoice {
    fn to_value(&self) -> Value {
        let mut map: BTreeMap<String, Value> = BTreeMap::new();
        map.insert("invoice_number".into(), self.invoice_number.clone().into());
        map.insert(
            "issue_date".into(),
            self.issue_date.map(|d| d.to_string()).into(),
        );
        map.insert("invoice_type".into(), self.invoice_type.clone().into());
        map.insert("country".into(), self.country.clone().into());
        map.insert("currency".into(), self.currency.clone().into());
        map.insert("tenant_id".into(), self.tenant_id.clone().into());
        map.insert("supplier".into(), self.supplier.to_value());
        map.insert("customer".into(), self.customer.to_value());
        map.insert("items".into(), self.items_value());
        map.insert("total_amount".into(), self.total_amount.into());
        map.insert("tax_amount".into(), self.tax_amount.into());
        map.insert("net_amount".into(), self.net_amount.into());
        map.insert("extensions".into(), Value::Map(self.extensions.clone()));
        Value::Map(map)
    }

    fn get_path(&self, path: &[String]) -> Option<Value> {
        let Some((head, rest)) = path.split_first() else {
            return Some(self.to_value());
        };
        match head.as_str() {
            "invoice_number" => leaf(self.invoice_number.clone().into(), rest),
            "issue_date" => leaf(self.issue_date.map(|d| d.to_string()).into(), rest),
            "invoice_type" => leaf(self.invoice_type.clone().into(), rest),
            "country" => leaf(self.country.clone().into(), rest),
            "currency" => leaf(self.currency.clone().into(), rest),
            "tenant_id" => leaf(self.tenant_id.clone().into(), rest),
            "supplier" => self.supplier.get(rest),
            "customer" => self.customer.get(rest),
            "items" => match rest.split_first() {
                None => Some(self.items_value()),
                Some((index, tail)) => self.items.get(index.parse::<usize>().ok()?)?.get(tail),
            },
            "total_amount" => leaf(self.total_amount.into(), rest),
            "tax_amount" => leaf(self.tax_amount.into(), rest),
            "net_amount" => leaf(self.net_amount.into(), rest),
            "extensions" => map_get(&self.extensions, rest),
            _ => None,
        }
    }

    fn set_path(&mut self, path: &[String], value: Value) -> Result<()> {
        let Some((head, rest)) = path.split_first() else {
            return Err(Error::invalid_argument("cannot replace the whole invoice"));
        };
        match head.as_str() {
            "invoice_number" => set_string(&mut self.invoice_number, rest, value, head),
            "issue_date" => set_date(&mut self.issue_date, rest, value, head),
            "invoice_type" => set_string(&mut self.invoice_type, rest, value, head),
            "country" => set_string(&mut self.country, rest, value, head),
            "currency" => set_string(&mut self.currency, rest, value, head),
            "tenant_id" => set_string(&mut self.tenant_id, rest, value, head),
            "supplier" => self.supplier.set(rest, value),
            "customer" => self.customer.set(rest, value),
            "items" => match rest.split_first() {
                None => {
                    self.items = from_value(value, "items")?;
                    Ok(())
                }
                Some((index, tail)) => {
                    let index = parse_index(index)?;
                    self.set_item_path("items", index, tail, value)
                }
            },
            "total_amount" => set_decimal(&mut self.total_amount, rest, value, head),
            "tax_amount" => set_decimal(&mut self.tax_amount, rest, value, head),
            "net_amount" => set_decimal(&mut self.net_amount, rest, value, head),
            "extensions" => map_set(&mut self.extensions, rest, value),
            other => Err(unknown_field("invoice", other)),
        }
    }

    fn collection_len(&self, collection: &str) -> Option<usize> {
        match collection {
            "items" => Some(self.items.len()),
            _ => None,
        }
    }

    fn item_value(&self, collection: &str, index: usize) -> Option<Value> {
        match collection {
            "items" => self.items.get(index).map(Accessor::to_value),
            _ => None,
        }
    }

    fn set_item_path(
        &mut self,
        collection: &str,
        index: usize,
        path: &[String],
        value: Value,
    ) -> Result<()> {
        match collection {
            "items" => {
                let len = self.items.len();
                let item = self.items.get_mut(index).ok_or_else(|| {
                    Error::invalid_argument(format!(
                        "item index {index} out of range (len {len})"
                    ))
                })?;
                item.set(path, value)
            }
            other => Err(unknown_field("invoice collection", other)),
        }
    }

    fn get_item_path(&self, collection: &str, index: usize, path: &[String]) -> Option<Value> {
        match collection {
            "items" => self.items.get(index)?.get(path),
            _ => None,
        }
    }

    fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }
}

fn leaf(value: Value, rest: &[String]) -> Option<Value> {
    if rest.is_empty() {
        Some(value)
    } else {
        value.get_path(rest).cloned()
    }
}

fn map_get(map: &BTreeMap<String, Value>, path: &[String]) -> Option<Value> {
    match path.split_first() {
        None => Some(Value::Map(map.clone())),
        Some((head, rest)) => map.get(head)?.get_path(rest).cloned(),
    }
}

/// Write into a dynamic bag, creating intermediate maps
fn map_set(map: &mut BTreeMap<String, Value>, path: &[String], value: Value) -> Result<()> {
    let Some((head, rest)) = path.split_first() else {
        return match value {
            Value::Map(new_map) => {
                *map = new_map;
                Ok(())
            }
            Value::Null => {
                map.clear();
                Ok(())
            }
            other => Err(type_error("extension map", "map", &other)),
        };
    };
    if rest.is_empty() {
        map.insert(head.clone(), value);
        return Ok(());
    }
    let entry = map
        .entry(head.clone())
        .or_insert_with(|| Value::Map(BTreeMap::new()));
    if entry.is_null() {
        *entry = Value::Map(BTreeMap::new());
    }
    match entry {
        Value::Map(inner) => map_set(inner, rest, value),
        other => Err(Error::invalid_argument(format!(
            "cannot write below '{head}': it holds a {}",
            other.type_name()
        ))),
    }
}

fn ensure_leaf(rest: &[String], field: &str) -> Result<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(Error::invalid_argument(format!(
            "'{field}' is a scalar field and has no '{}'",
            rest.join(".")
        )))
    }
}

fn set_string(slot: &mut Option<String>, rest: &[String], value: Value, field: &str) -> Result<()> {
    ensure_leaf(rest, field)?;
    *slot = match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        v @ (Value::Number(_) | Value::Bool(_)) => Some(v.to_plain_string()),
        other => return Err(type_error(field, "string", &other)),
    };
    Ok(())
}

fn set_decimal(
    slot: &mut Option<Decimal>,
    rest: &[String],
    value: Value,
    field: &str,
) -> Result<()> {
    ensure_leaf(rest, field)?;
    *slot = match &value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        other => Some(other.to_decimal().ok_or_else(|| type_error(field, "number", other))?),
    };
    Ok(())
}

fn set_date(
    slot: &mut Option<NaiveDate>,
    rest: &[String],
    value: Value,
    field: &str,
) -> Result<()> {
    ensure_leaf(rest, field)?;
    *slot = match &value {
        Value::Null => None,
        Value::String(s) => Some(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(
            |e| Error::invalid_argument(format!("'{field}' expects YYYY-MM-DD: {e}")),
        )?),
        other => return Err(type_error(field, "date string", other)),
    };
    Ok(())
}

fn parse_index(segment: &str) -> Result<usize> {
    segment
        .parse::<usize>()
        .map_err(|_| Error::invalid_argument(format!("'{segment}' is not a collection index")))
}

fn from_value<T: DeserializeOwned>(value: Value, what: &str) -> Result<T> {
    serde_json::from_value(value.to_json())
        .map_err(|e| Error::invalid_argument(format!("cannot convert value into {what}: {e}")))
}

fn unknown_field(owner: &str, field: &str) -> Error {
    Error::not_found(format!("{owner} field '{field}'"))
}

fn type_error(field: &str, expected: &str, found: &Value) -> Error {
    Error::invalid_argument(format!(
        "'{field}' expects a {expected}, found {}",
        found.type_name()
    ))
}

