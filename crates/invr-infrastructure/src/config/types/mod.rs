//! Configuration types

pub mod engine;
pub mod logging;

pub use engine::{BatchConfig, FunctionsConfig, ReferenceDataConfig, RulesConfig, SmartQueryConfig};
pub use logging::LoggingConfig;

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub rules: RulesConfig,
    pub smart_query: SmartQueryConfig,
    pub functions: FunctionsConfig,
    pub batch: BatchConfig,
    pub reference_data: ReferenceDataConfig,
}
