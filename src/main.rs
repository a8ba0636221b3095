use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod batch;
mod classify;
mod cli;
mod client;
mod config;
mod endpoint;
mod error;
mod error_view;
mod identity;
mod mmif;
mod pipeline;
mod stats;
mod util;
mod workflow;

use cli::{Command, RootArgs};

fn main() -> Result<()> {
    let args = RootArgs::parse();

    let default_filter = if args.verbose() {
        "mmif_pipeline=info"
    } else {
        "mmif_pipeline=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match args.command {
        Command::Run(args) => workflow::run_pipeline(&args),
        Command::Stats(args) => workflow::run_stats(&args),
    }
}
