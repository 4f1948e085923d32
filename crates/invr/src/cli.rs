//! Command line arguments for the `invr` binary

use clap::{Args, Parser, Subcommand};
use invr_engine::MergeStrategy;
use std::path::PathBuf;

/// Command line interface for the invoice rule engine
#[derive(Parser, Debug)]
#[command(name = "invr")]
#[command(about = "Invoice rule engine - field completion and business validation")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Rule file or directory, overriding `rules.path`
    #[arg(long, global = true, value_name = "PATH")]
    pub rules: Option<PathBuf>,

    /// Reference data file, overriding `reference_data.path`
    #[arg(long = "reference-data", global = true, value_name = "PATH")]
    pub reference_data: Option<PathBuf>,

    /// Log level, overriding `logging.level`
    #[arg(long = "log-level", global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fill missing fields of an invoice
    Complete(InputArgs),

    /// Check an invoice against the validation rules
    Validate(InputArgs),

    /// Complete an invoice, then validate the result
    Process(InputArgs),

    /// Process many invoices concurrently
    Batch(BatchArgs),

    /// Evaluate one expression, optionally against an invoice
    Eval(EvalArgs),

    /// Lint rule files without running them
    Check(CheckArgs),
}

#[derive(Args, Debug)]
pub struct InputArgs {
    /// Invoice JSON file, or `-` for stdin
    #[arg(value_name = "INVOICE", default_value = "-")]
    pub input: PathBuf,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Directory of `*.json` invoices, or a file holding a JSON array
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Records processed at once, overriding `batch.concurrency`
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// none, by_customer, by_supplier, by_date or custom, overriding `batch.merge_strategy`
    #[arg(long, value_name = "STRATEGY")]
    pub merge: Option<MergeStrategy>,

    /// Grouping path for the merge, repeatable, replacing `batch.merge_keys`
    #[arg(long = "merge-key", value_name = "PATH")]
    pub merge_keys: Vec<String>,

    /// Split invoices with more line items, overriding `batch.max_items_per_invoice`
    #[arg(long, value_name = "N")]
    pub max_items: Option<usize>,
}

#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Expression text, e.g. `total_amount * 0.06`
    pub expression: String,

    /// Invoice JSON file providing the record scope
    #[arg(long, value_name = "INVOICE")]
    pub record: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Rule file or directory; defaults to the configured rules path
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,
}
