//! Subcommand implementations
//!
//! Every command produces one JSON document plus a success flag that the
//! binary turns into the exit code.

use crate::cli::{BatchArgs, CheckArgs, Cli, Command, EvalArgs, InputArgs};
use anyhow::{Context, Result, bail};
use invr_domain::value_objects::ExecutionTrace;
use invr_domain::{Invoice, RuleSet};
use invr_engine::{CancellationToken, DiagnosticLevel, RuleDiagnostic, check_rules};
use invr_infrastructure::bootstrap::build_collaborators;
use invr_infrastructure::config::loader::validate_app_config;
use invr_infrastructure::config::{AppConfig, ConfigLoader};
use invr_infrastructure::data::ReferenceData;
use invr_infrastructure::{AppContext, YamlRuleSource, init_app};
use serde::Serialize;
use serde_json::Value as Json;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

/// JSON document printed by a command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub json: Json,
    /// False when validation failed or lint found errors
    pub success: bool,
}

impl CommandOutput {
    fn new<T: Serialize>(value: &T, success: bool) -> Result<Self> {
        Ok(Self {
            json: serde_json::to_value(value).context("Failed to encode output")?,
            success,
        })
    }
}

#[derive(Serialize)]
struct Processed<'a, T: Serialize> {
    invoice: &'a Invoice,
    #[serde(flatten)]
    result: T,
}

#[derive(Serialize)]
struct Completed {
    completion: ExecutionTrace,
}

#[derive(Serialize)]
struct EvalOutput<'a> {
    expression: &'a str,
    value: Json,
    fallbacks: Vec<FallbackOutput>,
}

#[derive(Serialize)]
struct FallbackOutput {
    source: String,
    value: Json,
    reason: String,
}

#[derive(Serialize)]
struct CheckOutput {
    rules: usize,
    diagnostics: Vec<RuleDiagnostic>,
}

/// Load configuration and apply command line overrides
pub fn load_config(cli: &Cli) -> Result<AppConfig> {
    let loader = match &cli.config {
        Some(path) => ConfigLoader::new().with_config_path(path),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load()?;
    if let Some(rules) = &cli.rules {
        config.rules.path.clone_from(rules);
    }
    if let Some(reference) = &cli.reference_data {
        config.reference_data.path.clone_from(reference);
    }
    if let Some(level) = &cli.log_level {
        config.logging.level.clone_from(level);
    }
    if let Command::Batch(args) = &cli.command {
        apply_batch_overrides(&mut config, args)?;
    }
    // one-shot commands never need the watcher
    config.rules.watch = false;
    Ok(config)
}

fn apply_batch_overrides(config: &mut AppConfig, args: &BatchArgs) -> Result<()> {
    let batch = &mut config.batch;
    if let Some(concurrency) = args.concurrency {
        batch.concurrency = concurrency;
    }
    if let Some(strategy) = args.merge {
        batch.merge_strategy = strategy;
    }
    if !args.merge_keys.is_empty() {
        batch.merge_keys.clone_from(&args.merge_keys);
    }
    if let Some(max_items) = args.max_items {
        batch.max_items_per_invoice = Some(max_items);
    }
    validate_app_config(config).context("Invalid batch options")?;
    Ok(())
}

/// Run the selected command
pub async fn run(command: &Command, config: AppConfig) -> Result<CommandOutput> {
    match command {
        Command::Check(args) => check(args, &config).await,
        Command::Complete(args) => complete(args, &init_app(config).await?).await,
        Command::Validate(args) => validate(args, &init_app(config).await?).await,
        Command::Process(args) => process(args, &init_app(config).await?).await,
        Command::Batch(args) => batch(args, &init_app(config).await?).await,
        Command::Eval(args) => eval(args, &init_app(config).await?).await,
    }
}

async fn complete(args: &InputArgs, context: &AppContext) -> Result<CommandOutput> {
    let mut invoice = read_invoice(&args.input).await?;
    let trace = context
        .engine()
        .complete(&mut invoice, &context.rules().snapshot())
        .await;
    CommandOutput::new(
        &Processed {
            invoice: &invoice,
            result: Completed { completion: trace },
        },
        true,
    )
}

async fn validate(args: &InputArgs, context: &AppContext) -> Result<CommandOutput> {
    let invoice = read_invoice(&args.input).await?;
    let result = context
        .engine()
        .validate(&invoice, &context.rules().snapshot())
        .await;
    CommandOutput::new(&result, result.valid)
}

async fn process(args: &InputArgs, context: &AppContext) -> Result<CommandOutput> {
    let mut invoice = read_invoice(&args.input).await?;
    let outcome = context
        .engine()
        .process(
            &mut invoice,
            &context.rules().snapshot(),
            &CancellationToken::new(),
        )
        .await;
    let valid = outcome.validation.valid;
    CommandOutput::new(
        &Processed {
            invoice: &invoice,
            result: outcome,
        },
        valid,
    )
}

async fn batch(args: &BatchArgs, context: &AppContext) -> Result<CommandOutput> {
    let invoices = read_batch(&args.input).await?;
    let processor = context.batch_processor();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling batch");
            on_interrupt.cancel();
        }
    });
    let report = processor
        .process(invoices, context.rules().snapshot(), cancel)
        .await;
    interrupt.abort();

    let success = !report.cancelled && report.valid_count() == report.results.len();
    CommandOutput::new(&report, success)
}

async fn eval(args: &EvalArgs, context: &AppContext) -> Result<CommandOutput> {
    let record = match &args.record {
        Some(path) => read_invoice(path).await?,
        None => Invoice::default(),
    };
    let evaluated = context
        .engine()
        .evaluate(&args.expression, &record)
        .await
        .with_context(|| format!("Failed to evaluate `{}`", args.expression))?;
    let fallbacks = evaluated
        .fallbacks
        .into_iter()
        .map(|note| FallbackOutput {
            source: note.source,
            value: note.value.to_json(),
            reason: note.reason,
        })
        .collect();
    CommandOutput::new(
        &EvalOutput {
            expression: &args.expression,
            value: evaluated.value.to_json(),
            fallbacks,
        },
        true,
    )
}

async fn check(args: &CheckArgs, config: &AppConfig) -> Result<CommandOutput> {
    let path = args.path.as_ref().unwrap_or(&config.rules.path);
    let rules = YamlRuleSource::new(path).load_rules().await?;
    let count = rules.len();
    // duplicate ids and missing targets are reported as a hard error
    RuleSet::new(rules.clone())?;

    let reference = ReferenceData::load(&config.reference_data.path).await?;
    let (_, functions) = build_collaborators(config, reference)?;
    let diagnostics = check_rules(&rules, functions.as_ref());
    debug!(rules = count, findings = diagnostics.len(), "Rule check finished");

    let success = !diagnostics
        .iter()
        .any(|d| d.level == DiagnosticLevel::Error);
    CommandOutput::new(
        &CheckOutput {
            rules: count,
            diagnostics,
        },
        success,
    )
}

/// Read text from a file, or from stdin for `-`
pub async fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read stdin")?;
        return Ok(text);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

async fn read_invoice(path: &Path) -> Result<Invoice> {
    let text = read_input(path).await?;
    serde_json::from_str(&text).with_context(|| format!("Invalid invoice in {}", path.display()))
}

/// Invoices from a directory of JSON files (name order) or a JSON array file
pub async fn read_batch(path: &Path) -> Result<Vec<Invoice>> {
    if !path.is_dir() {
        let text = read_input(path).await?;
        return serde_json::from_str(&text)
            .with_context(|| format!("Expected a JSON array of invoices in {}", path.display()));
    }

    let mut files: Vec<PathBuf> = Vec::new();
    let mut entries = tokio::fs::read_dir(path)
        .await
        .with_context(|| format!("Failed to list {}", path.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        let file = entry.path();
        if file.extension().is_some_and(|ext| ext == "json") {
            files.push(file);
        }
    }
    if files.is_empty() {
        bail!("No .json invoices in {}", path.display());
    }
    files.sort();

    let mut invoices = Vec::with_capacity(files.len());
    for file in files {
        invoices.push(read_invoice(&file).await?);
    }
    Ok(invoices)
}

/// Serialize a command output for printing
pub fn render(output: &CommandOutput, pretty: bool) -> Result<String> {
    let text = if pretty {
        serde_json::to_string_pretty(&output.json)?
    } else {
        serde_json::to_string(&output.json)?
    };
    Ok(text)
}
