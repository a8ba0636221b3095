//! CLI argument parsing for pipeline runs.
//!
//! The CLI only gathers inputs; path checks, config loading, and execution
//! happen in the workflow so they run in a fixed order.
use crate::config::ExecutionContext;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_FILE: &str = "config.yml";
pub const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";

#[derive(Parser, Debug)]
#[command(
    name = "mmif-pipeline",
    version,
    about = "Run MMIF documents through a fixed sequence of annotation services",
    after_help = "Examples:\n  mmif-pipeline run --context host input.json out.json\n  mmif-pipeline run --context managed --abort /data/in /data/out tokenizer spacy\n  mmif-pipeline run --context host --params \"spacy-model=en_sm\" in.json out.json\n  mmif-pipeline stats out.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Run(RunArgs),
    Stats(StatsArgs),
}

impl RootArgs {
    pub fn verbose(&self) -> bool {
        match &self.command {
            Command::Run(args) => args.verbose,
            Command::Stats(_) => false,
        }
    }
}

/// Run command inputs.
#[derive(Parser, Debug)]
#[command(about = "Process a file or a directory of files through the pipeline")]
pub struct RunArgs {
    /// Input MMIF file, or a directory of MMIF files
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file or directory; must not exist yet
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Services to run, in order (default: every configured service)
    #[arg(value_name = "SERVICE")]
    pub pipeline: Vec<String>,

    /// Whether this process runs on the host or inside the managed runtime
    #[arg(long, value_enum)]
    pub context: ExecutionContext,

    /// Pipeline config declaring the services
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Compose file with published ports (optional on disk)
    #[arg(long, value_name = "PATH", default_value = DEFAULT_COMPOSE_FILE)]
    pub compose: PathBuf,

    /// Print progress to standard error
    #[arg(short, long)]
    pub verbose: bool,

    /// Save the output of every step next to the final output
    #[arg(short, long)]
    pub intermediate: bool,

    /// Stop processing a file at the first failing step
    #[arg(long)]
    pub abort: bool,

    /// Parameter overrides, e.g. "spacy-model=en_sm,tokenizer-eol=true"
    #[arg(long, value_name = "PARAMETERS")]
    pub params: Option<String>,

    /// Pretty-print documents written by the pipeline itself
    #[arg(long)]
    pub pretty: bool,

    /// Write a JSON run report (steps, outcomes, timings) to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

/// Stats command inputs.
#[derive(Parser, Debug)]
#[command(about = "Summarize the views of processed MMIF files")]
pub struct StatsArgs {
    /// MMIF files to summarize
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,
}
