//! `colmap` command-line tool.

use std::io::{self, IsTerminal};

use clap::{ColorChoice, Parser};
use colmap_cli::logging::{LogConfig, LogFormat, init_logging};
use colmap_cli::report::{entries_table, session_table};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod progress;

use crate::cli::{Cli, Command, EventFormatArg, LogFormatArg, LogLevelArg};
use crate::commands::{
    GenerateReport, run_datasets, run_export, run_frameworks, run_generate, run_import,
    run_sessions, run_show,
};

fn main() {
    // A missing .env file is fine; variables may come from the environment.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }

    let store = cli.store.as_path();
    let exit_code = match cli.command {
        Command::Generate(args) => match run_generate(store, &args, cli.log_data) {
            Ok(report) => {
                if matches!(args.events, EventFormatArg::None) {
                    print_generate_summary(&report);
                }
                if let Some(failure) = &report.failure {
                    eprintln!("error: {failure}");
                }
                if report.succeeded() { 0 } else { 1 }
            }
            Err(error) => report_error(&error),
        },
        Command::Sessions => exit_code(run_sessions(store)),
        Command::Show(args) => match run_show(store, args.session) {
            Ok(session) => {
                println!("Session: {}", session.id);
                println!("Dataset: {}", session.dataset_id);
                println!("Framework: {}", session.framework_id);
                println!(
                    "Created: {}",
                    session.created_at.format("%Y-%m-%d %H:%M:%S UTC")
                );
                println!("{}", session_table(&session));
                if !args.summary_only {
                    println!("{}", entries_table(&session.entries));
                }
                0
            }
            Err(error) => report_error(&error),
        },
        Command::Export(args) => exit_code(run_export(store, &args)),
        Command::Datasets => exit_code(run_datasets(store)),
        Command::Frameworks => exit_code(run_frameworks(store)),
        Command::Import(args) => exit_code(run_import(store, &args)),
    };
    std::process::exit(exit_code);
}

fn print_generate_summary(report: &GenerateReport) {
    let Some(session) = &report.session else {
        return;
    };
    println!("Session: {}", session.id);
    println!("{}", session_table(session));
    if report.group_errors > 0 {
        eprintln!(
            "{} sheet(s) could not be saved; see the log for details",
            report.group_errors
        );
    }
}

fn exit_code(result: anyhow::Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(error) => report_error(&error),
    }
}

fn report_error(error: &anyhow::Error) -> i32 {
    eprintln!("error: {error:#}");
    1
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.log_data = cli.log_data;
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
