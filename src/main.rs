mod agent;
mod backend;
mod cli;
mod config;
mod error;
mod pipeline;
mod post;
mod render;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let default_filter = if cli.verbose {
        "gstage=debug"
    } else {
        "gstage=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load_unvalidated()?;
    cli.run(config).await
}
