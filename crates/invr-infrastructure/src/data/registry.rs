//! Function host composed of several hosts

use async_trait::async_trait;
use invr_domain::error::{Error, Result};
use invr_domain::ports::FunctionHost;
use invr_domain::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Dispatches each call to the first registered host serving the name
///
/// Configured defaults take precedence over a host's own
/// [`FunctionHost::default_value`].
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    hosts: Vec<Arc<dyn FunctionHost>>,
    defaults: BTreeMap<String, Value>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_host(mut self, host: Arc<dyn FunctionHost>) -> Self {
        self.hosts.push(host);
        self
    }

    #[must_use]
    pub fn with_defaults(mut self, defaults: BTreeMap<String, Value>) -> Self {
        self.defaults.extend(defaults);
        self
    }

    fn host_for(&self, name: &str) -> Option<&Arc<dyn FunctionHost>> {
        self.hosts.iter().find(|h| h.has_function(name))
    }
}

#[async_trait]
impl FunctionHost for FunctionRegistry {
    fn has_function(&self, name: &str) -> bool {
        self.host_for(name).is_some()
    }

    async fn call(&self, name: &str, args: &[Value], context: &Value) -> Result<Value> {
        match self.host_for(name) {
            Some(host) => host.call(name, args, context).await,
            None => Err(Error::not_found(format!("function '{name}'"))),
        }
    }

    fn default_value(&self, name: &str) -> Value {
        if let Some(value) = self.defaults.get(name) {
            return value.clone();
        }
        self.host_for(name)
            .map_or(Value::Null, |host| host.default_value(name))
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("hosts", &self.hosts.len())
            .field("defaults", &self.defaults)
            .finish()
    }
}
