//! Invoice rule engine - entry point
//!
//! | Command | Description |
//! |---------|-------------|
//! | `invr complete INVOICE` | Fill missing fields |
//! | `invr validate INVOICE` | Run business validation |
//! | `invr process INVOICE` | Complete, then validate |
//! | `invr batch DIR` | Process many invoices |
//! | `invr eval EXPR` | Evaluate one expression |
//! | `invr check [RULES]` | Lint rule files |
//!
//! Output is JSON on stdout; logs go to stderr. Exit code 1 means the
//! invoice failed validation or the rules have errors, 2 means the command
//! itself failed.

use clap::Parser;
use invr::cli::Cli;
use invr::commands::{load_config, render, run};
use invr_infrastructure::logging::init_logging;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match execute(&cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn execute(cli: &Cli) -> anyhow::Result<bool> {
    let config = load_config(cli)?;
    init_logging(&config.logging)?;
    let output = run(&cli.command, config).await?;
    println!("{}", render(&output, cli.pretty)?);
    Ok(output.success)
}
