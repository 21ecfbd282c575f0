use std::io::{stdout, IsTerminal};

use clap::Parser;
use subs::cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let stdout = stdout();
    let colour = stdout.is_terminal();
    cli.run(&mut stdout.lock(), colour)
}
