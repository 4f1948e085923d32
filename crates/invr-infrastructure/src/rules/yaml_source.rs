//! YAML rule source
//!
//! Rule files carry two lists:
//!
//! ```yaml
//! field_completion_rules:
//!   - id: default_country
//!     rule_name: Default country
//!     target_field: country
//!     rule_expression: "'CN'"
//!     priority: 100
//! field_validation_rules:
//!   - id: total_positive
//!     rule_name: Total positive
//!     field_path: total_amount
//!     rule_expression: total_amount > 0
//!     error_message: Total must be positive
//! ```
//!
//! A rule path may name a single file or a directory; directories are walked
//! for `*.yaml` / `*.yml` files in file-name order and their rules concatenated.

use crate::constants::RULE_FILE_EXTENSIONS;
use crate::error_ext::ErrorContext;
use async_trait::async_trait;
use invr_domain::constants::DEFAULT_RULE_PRIORITY;
use invr_domain::entities::rule::normalize_gate;
use invr_domain::entities::{CompletionMode, Rule, RuleKind, RuleSet, Severity};
use invr_domain::error::{Error, Result};
use invr_domain::ports::RuleSource;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// One rule as written in a rule file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub id: String,
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub rule_expression: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_active")]
    pub active: bool,
    /// `DEFAULT` fills empty targets only, `OVERRIDE` always writes
    #[serde(default, alias = "mode")]
    pub rule_type: CompletionMode,
    #[serde(default)]
    pub severity: Severity,
    /// `validation_any` turns a collection check into "at least one item passes"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<RuleKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

fn default_priority() -> i32 {
    DEFAULT_RULE_PRIORITY
}

fn default_active() -> bool {
    true
}

impl RuleDefinition {
    /// Convert into a domain rule for the section it was declared in
    pub fn into_rule(self, section: RuleKind) -> Result<Rule> {
        let kind = match (section, self.kind) {
            (RuleKind::Completion, None | Some(RuleKind::Completion)) => RuleKind::Completion,
            (RuleKind::Completion, Some(other)) | (_, Some(other @ RuleKind::Completion)) => {
                return Err(Error::invalid_rule(
                    &self.id,
                    format!("kind '{other:?}' does not belong in this section"),
                ));
            }
            (_, Some(kind)) => kind,
            (_, None) => RuleKind::Validation,
        };
        Ok(Rule {
            name: self.rule_name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            kind,
            apply_to: normalize_gate(self.apply_to),
            target_field: self.target_field,
            field_path: self.field_path,
            error_message: self.error_message,
            rule_expression: self.rule_expression,
            priority: self.priority,
            active: self.active,
            mode: self.rule_type,
            severity: self.severity,
            description: self.description,
            tenant_id: self.tenant_id,
        })
    }

    /// File form of a domain rule
    pub fn from_rule(rule: &Rule) -> Self {
        Self {
            id: rule.id.clone(),
            rule_name: Some(rule.name.clone()),
            apply_to: rule.apply_to.clone(),
            target_field: rule.target_field.clone(),
            field_path: rule.field_path.clone(),
            error_message: rule.error_message.clone(),
            rule_expression: rule.rule_expression.clone(),
            priority: rule.priority,
            active: rule.active,
            rule_type: rule.mode,
            severity: rule.severity,
            kind: (rule.kind == RuleKind::ValidationAny).then_some(rule.kind),
            description: rule.description.clone(),
            tenant_id: rule.tenant_id.clone(),
        }
    }
}

/// Contents of one rule file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleFile {
    pub field_completion_rules: Vec<RuleDefinition>,
    #[serde(alias = "business_validation_rules")]
    pub field_validation_rules: Vec<RuleDefinition>,
}

impl RuleFile {
    /// Parse rule file text; blank text is an empty file
    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).rule_context(format!("Invalid rule file {origin}"))
    }

    /// Domain rules in declaration order, completion rules first
    pub fn into_rules(self) -> Result<Vec<Rule>> {
        let completion = self
            .field_completion_rules
            .into_iter()
            .map(|d| d.into_rule(RuleKind::Completion));
        let validation = self
            .field_validation_rules
            .into_iter()
            .map(|d| d.into_rule(RuleKind::Validation));
        completion.chain(validation).collect()
    }

    /// File form of a rule set
    pub fn from_rules<'a>(rules: impl IntoIterator<Item = &'a Rule>) -> Self {
        let mut file = Self::default();
        for rule in rules {
            let definition = RuleDefinition::from_rule(rule);
            if rule.kind == RuleKind::Completion {
                file.field_completion_rules.push(definition);
            } else {
                file.field_validation_rules.push(definition);
            }
        }
        file
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).rule_context("Failed to serialize rules")
    }
}

/// Parse one rule file's text into domain rules
pub fn parse_rules(content: &str, origin: &str) -> Result<Vec<Rule>> {
    RuleFile::parse(content, origin)?.into_rules()
}

/// Rule source reading a YAML file or a directory of YAML files
#[derive(Debug, Clone)]
pub struct YamlRuleSource {
    path: PathBuf,
}

impl YamlRuleSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rule files to read, in load order
    pub fn rule_files(&self) -> Result<Vec<PathBuf>> {
        if self.path.is_file() {
            return Ok(vec![self.path.clone()]);
        }
        if !self.path.is_dir() {
            return Err(Error::rule_load(format!(
                "Rule path not found: {}",
                self.path.display()
            )));
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.path).sort_by_file_name() {
            let entry = entry.rule_context(format!("Failed to walk {}", self.path.display()))?;
            if entry.file_type().is_file() && is_rule_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    /// Read and parse every rule file without building a rule set
    pub async fn load_rules(&self) -> Result<Vec<Rule>> {
        let mut rules = Vec::new();
        for file in self.rule_files()? {
            let content = tokio::fs::read_to_string(&file)
                .await
                .io_context(format!("Failed to read rule file {}", file.display()))?;
            let parsed = parse_rules(&content, &file.display().to_string())?;
            debug!(file = %file.display(), rules = parsed.len(), "Parsed rule file");
            rules.extend(parsed);
        }
        Ok(rules)
    }
}

#[async_trait]
impl RuleSource for YamlRuleSource {
    async fn load(&self) -> Result<RuleSet> {
        RuleSet::new(self.load_rules().await?)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

fn is_rule_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| RULE_FILE_EXTENSIONS.contains(&e))
}
