mod assemble;
mod cli;
mod dataset;
mod error;
mod label;
mod pipeline;
mod reduce;
mod relocate;
mod report;
mod resolve;
#[cfg(test)]
mod testing;
mod time;

use std::process::ExitCode;

use clap::Parser;
use cli::{command, Cli, Commands};
use relocate::Relocation;
use tracing_subscriber::EnvFilter;

/// Exit status when the user keeps an existing destination file.
const DECLINED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Daily(args) => command::daily(args).await,
        Commands::Monthly(args) => command::monthly(args).await,
        Commands::Append(args) => command::append(args).await,
    };

    match result {
        Ok(outcome) => match outcome.relocation {
            Relocation::Moved(path) => {
                println!("File saved to `{}`", path.display());
                ExitCode::SUCCESS
            }
            Relocation::Declined { staged, .. } => {
                eprintln!("Not overwritten, combined data left at `{}`", staged.display());
                ExitCode::from(DECLINED)
            }
        },
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

// RUST_LOG takes precedence over --verbose.
fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
