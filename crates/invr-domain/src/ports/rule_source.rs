//! Rule loading port

use crate::entities::RuleSet;
use crate::error::Result;
use async_trait::async_trait;

/// Produces rule sets; errors abort the load and leave the previous set in place
#[async_trait]
pub trait RuleSource: Send + Sync {
    async fn load(&self) -> Result<RuleSet>;

    /// Human-readable origin for log lines
    fn describe(&self) -> String;
}
