mod cli;
mod commands;
mod config;
mod engine;
mod progress;
mod resource;
mod schema;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::HostenvConfig;
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: HostenvConfig,
}

fn main() -> Result<()> {
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

    match cli.command {
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "hostenv", &mut io::stdout());
            return Ok(());
        }
        Command::Fields { kind } => return commands::fields::run(kind),
        _ => {}
    }

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: HostenvConfig::load(cli.config.as_deref())?.with_overrides(cli.host, cli.api_key),
    };

    match cli.command {
        Command::Plan(args) => commands::environment::plan(&ctx, &args.file),
        Command::Apply(args) => commands::environment::apply(&ctx, &args.file, args.yes),
        Command::Show(args) => commands::environment::show(&ctx, &args.name, args.refresh),
        Command::Destroy(args) => commands::environment::destroy(&ctx, &args.name, args.yes),
        Command::Fields { .. } | Command::Completions { .. } => Ok(()),
    }
}
