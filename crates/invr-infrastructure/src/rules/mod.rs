//! Rule repository
//!
//! [`YamlRuleSource`] reads rule files, [`RuleStore`] holds the current
//! snapshot and [`RuleWatcher`] reloads it when the files change.

pub mod store;
pub mod watcher;
pub mod yaml_source;

pub use store::RuleStore;
pub use watcher::{RuleWatchEvent, RuleWatcher, RuleWatcherBuilder};
pub use yaml_source::{RuleDefinition, RuleFile, YamlRuleSource, parse_rules};
