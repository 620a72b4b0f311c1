//! CLI command definitions and dispatch.

pub mod convert;
pub mod export;
pub mod plan;

use clap::{Parser, Subcommand, ValueEnum};

/// ciconv: Compose documents to container instance payloads.
#[derive(Parser, Debug)]
#[command(name = "ciconv", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Log output format (filtered by `RUST_LOG`).
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log line format.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert a Compose document into a deployment payload.
    Convert(convert::ConvertArgs),
    /// Render a deployment payload back as a Compose document.
    Export(export::ExportArgs),
    /// Show the boot order and wait strategy of each service.
    Plan(plan::PlanArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Convert(args) => convert::execute(args),
        Command::Export(args) => export::execute(args),
        Command::Plan(args) => plan::execute(args),
    }
}

/// Turns a conversion error into a CLI error listing every message.
pub(crate) fn report_failure(err: &ciconv_common::error::CiconvError) -> anyhow::Error {
    let messages = err.messages();
    if messages.len() == 1 {
        return anyhow::anyhow!("{err}");
    }
    for message in &messages {
        tracing::error!(%message, "validation error");
    }
    let list: Vec<String> = messages.iter().map(|m| format!("  - {m}")).collect();
    anyhow::anyhow!(
        "compose document has {} error(s):\n{}",
        messages.len(),
        list.join("\n")
    )
}
