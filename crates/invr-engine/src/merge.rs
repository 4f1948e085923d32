//! Merging and splitting of completed records
//!
//! A batch can fold records sharing a grouping key into one record (by
//! customer, by supplier, by issue date or by configured paths) and then
//! split records holding more line items than allowed. Split parts share the
//! header amounts in proportion to their line amounts; the rounding remainder
//! (the tail difference) lands on the last part, so the parts always add up
//! to the amounts they were split from.

use crate::constants::AMOUNT_SCALE;
use invr_domain::entities::{Invoice, InvoiceItem};
use invr_domain::error::{Error, Result};
use invr_domain::record::Record;
use invr_domain::value_objects::FieldPath;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// How completed records are grouped into one record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Every record stays on its own
    #[default]
    None,
    /// Same `customer.tax_no`
    ByCustomer,
    /// Same `supplier.tax_no`
    BySupplier,
    /// Same `issue_date`
    ByDate,
    /// Same values at the configured key paths
    Custom,
}

impl MergeStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ByCustomer => "by_customer",
            Self::BySupplier => "by_supplier",
            Self::ByDate => "by_date",
            Self::Custom => "custom",
        }
    }

    fn key_paths(self) -> &'static [&'static str] {
        match self {
            Self::None | Self::Custom => &[],
            Self::ByCustomer => &["customer.tax_no"],
            Self::BySupplier => &["supplier.tax_no"],
            Self::ByDate => &["issue_date"],
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "by_customer" => Ok(Self::ByCustomer),
            "by_supplier" => Ok(Self::BySupplier),
            "by_date" => Ok(Self::ByDate),
            "custom" => Ok(Self::Custom),
            other => Err(Error::invalid_argument(format!(
                "unknown merge strategy '{other}'"
            ))),
        }
    }
}

/// Records that can be folded together and cut into parts
pub trait Mergeable: Record + Clone {
    /// Fold `other` into `self`; `self` keeps its identity and parties
    fn absorb(&mut self, other: Self);

    /// Cut into parts of at most `max_items` line items
    fn split(self, max_items: usize) -> Vec<Self>;
}

/// A record leaving the merge pass
#[derive(Debug, Clone, PartialEq)]
pub struct Merged<R> {
    /// Input positions folded into this record, ascending
    pub sources: Vec<usize>,
    pub record: R,
}

/// Grouping strategy plus split limit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergePlan {
    strategy: MergeStrategy,
    keys: Vec<Vec<String>>,
    max_items: Option<usize>,
}

impl MergePlan {
    pub fn new(strategy: MergeStrategy) -> Self {
        Self {
            strategy,
            keys: strategy
                .key_paths()
                .iter()
                .map(|path| path.split('.').map(str::to_string).collect())
                .collect(),
            max_items: None,
        }
    }

    /// Group additionally by these scalar paths (the only keys of `custom`)
    pub fn with_keys<I, S>(mut self, keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for key in keys {
            let key = key.as_ref();
            match FieldPath::parse(key)? {
                FieldPath::Scalar(segments) => self.keys.push(segments),
                FieldPath::Collection { .. } => {
                    return Err(Error::configuration(format!(
                        "merge key '{key}' must not be a collection path"
                    )));
                }
            }
        }
        Ok(self)
    }

    /// Split records holding more than `max_items` line items
    #[must_use]
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items.max(1));
        self
    }

    pub fn strategy(&self) -> MergeStrategy {
        self.strategy
    }

    pub fn max_items(&self) -> Option<usize> {
        self.max_items
    }

    /// Reject a `custom` strategy without keys
    pub fn validate(&self) -> Result<()> {
        if self.strategy == MergeStrategy::Custom && self.keys.is_empty() {
            return Err(Error::configuration(
                "merge strategy 'custom' needs at least one merge key",
            ));
        }
        Ok(())
    }

    /// Neither merges nor splits
    pub fn is_noop(&self) -> bool {
        !self.merges() && self.max_items.is_none()
    }

    fn merges(&self) -> bool {
        self.strategy != MergeStrategy::None && !self.keys.is_empty()
    }

    /// Merge, then split, `(input position, record)` pairs
    ///
    /// Groups come out in order of their first record and fold their members
    /// in input order. A record with a missing or empty key value is never
    /// merged. Split parts keep the sources of the record they came from.
    pub fn apply<R: Mergeable>(&self, records: Vec<(usize, R)>) -> Vec<Merged<R>> {
        let inputs = records.len();
        let mut merged: Vec<Merged<R>> = Vec::with_capacity(inputs);
        let mut groups: HashMap<Vec<String>, usize> = HashMap::new();

        for (index, record) in records {
            let key = if self.merges() {
                self.group_key(&record)
            } else {
                None
            };
            match key.as_ref().and_then(|key| groups.get(key)) {
                Some(&group) => {
                    let target = &mut merged[group];
                    target.record.absorb(record);
                    target.sources.push(index);
                }
                None => {
                    if let Some(key) = key {
                        groups.insert(key, merged.len());
                    }
                    merged.push(Merged {
                        sources: vec![index],
                        record,
                    });
                }
            }
        }

        let grouped = merged.len();
        let output: Vec<Merged<R>> = match self.max_items {
            Some(max_items) => merged
                .into_iter()
                .flat_map(|Merged { sources, record }| {
                    record
                        .split(max_items)
                        .into_iter()
                        .map(move |part| Merged {
                            sources: sources.clone(),
                            record: part,
                        })
                })
                .collect(),
            None => merged,
        };
        debug!(
            strategy = %self.strategy,
            inputs,
            grouped,
            outputs = output.len(),
            "Merge pass finished"
        );
        output
    }

    fn group_key<R: Record>(&self, record: &R) -> Option<Vec<String>> {
        self.keys
            .iter()
            .map(|path| {
                record
                    .get_path(path)
                    .map(|value| value.to_plain_string())
                    .filter(|text| !text.trim().is_empty())
            })
            .collect()
    }
}

impl Mergeable for Invoice {
    fn absorb(&mut self, other: Self) {
        fill(&mut self.issue_date, other.issue_date);
        fill(&mut self.invoice_type, other.invoice_type);
        fill(&mut self.country, other.country);
        fill(&mut self.currency, other.currency);
        fill(&mut self.tenant_id, other.tenant_id);
        self.total_amount = add(self.total_amount, other.total_amount);
        self.tax_amount = add(self.tax_amount, other.tax_amount);
        self.net_amount = add(self.net_amount, other.net_amount);
        self.items.extend(other.items);
        for (key, value) in other.extensions {
            self.extensions.entry(key).or_insert(value);
        }
    }

    fn split(mut self, max_items: usize) -> Vec<Self> {
        let max_items = max_items.max(1);
        if self.items.len() <= max_items {
            return vec![self];
        }

        let items = std::mem::take(&mut self.items);
        let chunks: Vec<Vec<InvoiceItem>> = items.chunks(max_items).map(<[_]>::to_vec).collect();
        let mut weights: Vec<Decimal> = chunks
            .iter()
            .map(|chunk| chunk.iter().filter_map(|item| item.amount).sum())
            .collect();
        if weights.iter().sum::<Decimal>().is_zero() {
            weights = chunks.iter().map(|chunk| Decimal::from(chunk.len())).collect();
        }
        let totals = share(self.total_amount, &weights);
        let taxes = share(self.tax_amount, &weights);
        let nets = share(self.net_amount, &weights);

        chunks
            .into_iter()
            .enumerate()
            .map(|(part, items)| Invoice {
                invoice_number: self
                    .invoice_number
                    .as_ref()
                    .map(|number| format!("{number}-{}", part + 1)),
                items,
                total_amount: totals[part],
                tax_amount: taxes[part],
                net_amount: nets[part],
                ..self.clone()
            })
            .collect()
    }
}

fn fill<T>(slot: &mut Option<T>, other: Option<T>) {
    if slot.is_none() {
        *slot = other;
    }
}

fn add(a: Option<Decimal>, b: Option<Decimal>) -> Option<Decimal> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Split `amount` by `weights`, rounded to cents; the last share takes the remainder
fn share(amount: Option<Decimal>, weights: &[Decimal]) -> Vec<Option<Decimal>> {
    let Some(amount) = amount else {
        return vec![None; weights.len()];
    };
    let total: Decimal = weights.iter().sum();
    let mut allotted = Decimal::ZERO;
    let mut shares = Vec::with_capacity(weights.len());
    for (position, weight) in weights.iter().enumerate() {
        let part = if position + 1 == weights.len() {
            amount - allotted
        } else {
            (amount * weight / total)
                .round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
        };
        allotted += part;
        shares.push(Some(part));
    }
    shares
}
