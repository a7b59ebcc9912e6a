//! CLI argument definitions for the `colmap` tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use colmap_map::{DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS, SAMPLE_ROWS};
use colmap_model::SessionId;

#[derive(Parser)]
#[command(
    name = "colmap",
    version,
    about = "Map source spreadsheet columns onto a standard schema with an LLM",
    long_about = "Map source spreadsheet columns onto a standard schema with an LLM.\n\n\
                  Datasets and frameworks are read from the store directory; each \
                  generation run is saved as a mapping session that can be listed, \
                  shown and exported to CSV.\n\n\
                  The oracle is configured through LLM_API_KEY, LLM_BASE_URL, LLM_MODEL, \
                  LLM_TEMPERATURE, LLM_MAX_TOKENS and LLM_TIMEOUT_SECS (a .env file is \
                  honoured)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow prompts and oracle responses, which contain source samples, in
    /// trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,

    /// Store directory holding datasets, frameworks and sessions.
    #[arg(
        long = "store",
        value_name = "DIR",
        env = "COLMAP_STORE_DIR",
        default_value = "colmap-data",
        global = true
    )]
    pub store: PathBuf,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a mapping session for a dataset and a framework.
    Generate(GenerateArgs),

    /// List mapping sessions, newest first.
    Sessions,

    /// Show a session's per-sheet summary and entries.
    Show(ShowArgs),

    /// Export a session's entries as CSV.
    Export(ExportArgs),

    /// List stored datasets.
    Datasets,

    /// List stored frameworks.
    Frameworks,

    /// Copy a dataset or framework JSON document into the store.
    Import(ImportArgs),
}

#[derive(Parser)]
pub struct GenerateArgs {
    /// Dataset id.
    #[arg(value_name = "DATASET")]
    pub dataset: String,

    /// Framework id.
    #[arg(value_name = "FRAMEWORK")]
    pub framework: String,

    /// Stream session events to stdout.
    #[arg(long = "events", value_enum, default_value = "none")]
    pub events: EventFormatArg,

    /// Maximum number of sheets sent to the oracle at once.
    #[arg(long = "concurrency", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Oracle attempts per sheet before falling back to placeholders.
    #[arg(long = "max-attempts", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: usize,

    /// Rows sampled from each source sheet.
    #[arg(long = "sample-rows", default_value_t = SAMPLE_ROWS)]
    pub sample_rows: usize,

    /// Offer every source sheet to every standard sheet.
    ///
    /// By default only source sheets whose name contains the standard
    /// sheet's name are included, falling back to all sheets when none do.
    #[arg(long = "no-filter-sheets")]
    pub no_filter_sheets: bool,

    /// Hide the progress bar.
    #[arg(long = "no-progress")]
    pub no_progress: bool,
}

#[derive(Parser)]
pub struct ShowArgs {
    /// Session id.
    #[arg(value_name = "SESSION")]
    pub session: SessionId,

    /// Only print the per-sheet summary.
    #[arg(long = "summary-only")]
    pub summary_only: bool,
}

#[derive(Parser)]
pub struct ExportArgs {
    /// Session id.
    #[arg(value_name = "SESSION")]
    pub session: SessionId,

    /// Output file (default: stdout).
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Parser)]
pub struct ImportArgs {
    /// Kind of document.
    #[arg(value_enum)]
    pub kind: ImportKind,

    /// Path to the JSON document.
    #[arg(value_name = "FILE")]
    pub path: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ImportKind {
    Dataset,
    Framework,
}

/// Event stream formats.
#[derive(Clone, Copy, ValueEnum)]
pub enum EventFormatArg {
    Jsonl,
    Sse,
    None,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
