//! Auxiliary function port

use crate::error::{Error, Result};
use crate::value::Value;
use async_trait::async_trait;

/// Host for functions such as `get_tax_rate(item.description)`
///
/// Calls are rewritten to literals before evaluation; a failed or slow call
/// is replaced by [`FunctionHost::default_value`].
#[async_trait]
pub trait FunctionHost: Send + Sync {
    /// Whether `name` is served by this host
    fn has_function(&self, name: &str) -> bool;

    /// Invoke `name` with evaluated arguments; `context` is the record scope
    async fn call(&self, name: &str, args: &[Value], context: &Value) -> Result<Value>;

    /// Value substituted when a call fails
    fn default_value(&self, name: &str) -> Value;
}

/// Host with no functions
#[derive(Debug, Clone, Copy, Default)]
pub struct NullFunctionHost;

#[async_trait]
impl FunctionHost for NullFunctionHost {
    fn has_function(&self, _name: &str) -> bool {
        false
    }

    async fn call(&self, name: &str, _args: &[Value], _context: &Value) -> Result<Value> {
        Err(Error::not_found(format!("function '{name}'")))
    }

    fn default_value(&self, _name: &str) -> Value {
        Value::Null
    }
}
