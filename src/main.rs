mod catalog;
mod cli;
mod commands;
mod config;
mod engine;
mod facts;
mod paths;
mod progress;
mod resource;
mod schema;
mod signal;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match dispatch(&ctx, cli.command) {
        Ok(code) => code,
        Err(e) => {
            ui::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn dispatch(ctx: &Context, command: Command) -> Result<ExitCode> {
    match command {
        Command::Facts { json } => commands::facts::run(ctx, json)?,
        Command::Compile(args) => commands::compile::run(ctx, args)?,
        Command::Render(args) => commands::render::run(ctx, args)?,
        Command::Diff(args) => commands::diff::run(ctx, args)?,
        Command::Apply(args) => return commands::apply::run(ctx, args),
        Command::Status => commands::status::run(ctx)?,
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "sshcm", &mut io::stdout());
        }
    }
    Ok(ExitCode::SUCCESS)
}
