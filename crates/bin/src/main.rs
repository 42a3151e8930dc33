mod cli;
mod commands;
mod output;
mod session;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::output::OutputFormat;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("arbor=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::from(cli.format);
    let settings = cli.settings.as_deref();

    match &cli.command {
        Commands::Show(args) => commands::show::run(args, settings, format).await,
        Commands::Set(args) => commands::set::run(args, settings, format).await,
        Commands::Invoke(args) => commands::invoke::run(args, settings, format).await,
    }
}
