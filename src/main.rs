mod cli;
mod commands;
mod config;
mod controller;
mod engine;
mod error;
mod hosts;
mod paths;
mod progress;
mod state;
mod ui;

use anyhow::{Context as AnyhowContext, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::fs::OpenOptions;
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: Option<String>,
    pub hosts: Option<String>,
    pub state_file: Option<String>,
}

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = cli::parse_exit_code(&err);
            // Nothing is left to report to if the terminal is gone.
            err.print().ok();
            std::process::exit(code);
        }
    };

    init_logging(&cli)?;

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config.clone(),
        hosts: cli.hosts.clone(),
        state_file: cli.state_file.clone(),
    };
    log::debug!("cmscale {} (verbosity {})", env!("CARGO_PKG_VERSION"), ctx.verbose);

    if let Some((kind, args)) = cli.command.operation() {
        return commands::scale::run(&ctx, kind, args);
    }

    match cli.command {
        Command::Status => commands::status::run(&ctx),
        Command::Reset { yes } => commands::reset::run(&ctx, yes),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "cmscale", &mut io::stdout());
            Ok(())
        }
        Command::ScaleUp(_) | Command::ScaleDown(_) => Ok(()),
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp_secs();

    if let Some(path) = &cli.log_file {
        let path = paths::expand(path);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        // The file keeps the full step history even when the terminal is quiet.
        builder
            .filter_level(log_level.max(log::LevelFilter::Info))
            .target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}
