//! Aufait CLI: the `aufait` command.

mod cli;
mod commands;
mod config;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let settings = config::resolve(&cli.global).unwrap_or_else(|e| support::exit_with_error(e));
    support::init_logging(&settings.log);

    match cli.command {
        Commands::Hook {
            package,
            published_version,
            actor,
            dry_run,
            json,
        } => commands::hook::run(
            &settings,
            commands::hook::Args {
                package,
                version: published_version,
                actor,
                dry_run,
                json,
            },
        ),

        Commands::Job { command } => commands::job::run(&settings, command),

        Commands::Repo { command } => commands::repo::run(&settings, command),
    }
}
