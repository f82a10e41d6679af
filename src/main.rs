// src/main.rs

use clap::Parser;
use git_ledger::cli::{self, Cli};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let start_time = Instant::now();
    cli::run(args)?;
    info!("Total time: {:.2?}", start_time.elapsed());
    Ok(())
}
