use std::time::Instant;

use clap::Parser;
use eyre::Result;

use cli::{init_verbose, Cli, Command};

mod cli;
mod commands;
mod manifest;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_verbose(&cli);
    log::info!(
        "Running {}-{} [{}]",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        cli.command.name()
    );

    let timer = Instant::now();
    match cli.command {
        Command::Screen(args) => {
            log::trace!("Screen arguments: {:#?}", args);
            commands::screen(args)?
        }
        Command::Validate(args) => {
            log::trace!("Validate arguments: {:#?}", args);
            commands::validate(args)?
        }
    }

    log::info!("Total execution time: {:.2?}", timer.elapsed());
    Ok(())
}
