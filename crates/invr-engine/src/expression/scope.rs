//! Evaluation scope

use invr_domain::constants::{ITEM_BINDING, RECORD_ALIAS};
use invr_domain::record::Record;
use invr_domain::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Names visible to an expression
///
/// The record's top-level fields are bound directly and the whole record is
/// also reachable as `invoice`. An item-augmented scope adds `item` for the
/// collection element being processed. Variables back `$name` references in
/// smart queries.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    root: Arc<Value>,
    item: Option<Value>,
    variables: Arc<BTreeMap<String, Value>>,
}

impl Scope {
    pub fn new(root: Value) -> Self {
        Self {
            root: Arc::new(root),
            item: None,
            variables: Arc::default(),
        }
    }

    /// Whole-record scope
    pub fn for_record<R: Record + ?Sized>(record: &R) -> Self {
        Self::new(record.to_value())
    }

    /// Item-augmented copy of this scope
    #[must_use]
    pub fn with_item(&self, item: Value) -> Self {
        Self {
            root: Arc::clone(&self.root),
            item: Some(item),
            variables: Arc::clone(&self.variables),
        }
    }

    #[must_use]
    pub fn with_variables(mut self, variables: BTreeMap<String, Value>) -> Self {
        self.variables = Arc::new(variables);
        self
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn item(&self) -> Option<&Value> {
        self.item.as_ref()
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Resolve a bare name the way expressions do
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        if name == ITEM_BINDING {
            if let Some(item) = &self.item {
                return Some(item);
            }
        }
        if let Some(value) = self.root.as_map().and_then(|m| m.get(name)) {
            return Some(value);
        }
        if name == RECORD_ALIAS {
            return Some(&self.root);
        }
        None
    }

    /// Resolve a dotted path whose head is a bare name
    pub fn resolve_path(&self, path: &[String]) -> Option<&Value> {
        let (head, rest) = path.split_first()?;
        self.lookup(head)?.get_path(rest)
    }

    /// Value handed to auxiliary functions as their context
    pub fn context_value(&self) -> Value {
        match (&*self.root, &self.item) {
            (Value::Map(map), Some(item)) => {
                let mut map = map.clone();
                map.insert(ITEM_BINDING.to_string(), item.clone());
                Value::Map(map)
            }
            (root, _) => root.clone(),
        }
    }
}
