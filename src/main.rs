mod cli;
mod config;
mod core;
mod models;
mod sources;

#[cfg(feature = "gui")]
mod gui;

use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    if let Err(e) = cli::run(cli) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
