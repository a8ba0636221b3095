//! Command handlers wiring configuration, the executor, and the batch driver.
use crate::batch::{self, RunReport};
use crate::cli::{RunArgs, StatsArgs};
use crate::client::HttpClient;
use crate::config::PipelineConfig;
use crate::endpoint::{parse_overrides, resolve_pipeline};
use crate::error::PipelineError;
use crate::mmif::Document;
use crate::pipeline::{Pipeline, RunOptions};
use crate::stats::render_stats;
use crate::util::{display_path, write_atomic};
use anyhow::{Context, Result};
use std::fs;

/// Run the pipeline over a file or directory.
///
/// Path checks come first so a bad invocation fails before config is read or
/// any service is contacted.
pub fn run_pipeline(args: &RunArgs) -> Result<()> {
    batch::preflight(&args.input, &args.output)?;
    if let Some(report_path) = &args.report {
        if report_path.exists() {
            return Err(PipelineError::OutputCollision(report_path.clone()).into());
        }
    }

    let config = PipelineConfig::load(&args.config, &args.compose)?;
    let overrides = parse_overrides(args.params.as_deref());
    let endpoints = resolve_pipeline(&config, &args.pipeline, args.context, &overrides)?;
    let options = RunOptions {
        intermediate: args.intermediate,
        abort_on_error: args.abort,
        pretty: args.pretty,
    };
    let pipeline = Pipeline::new(HttpClient::new(), endpoints, options);
    tracing::info!(
        services = ?pipeline
            .endpoints()
            .iter()
            .map(|endpoint| endpoint.service.as_str())
            .collect::<Vec<_>>(),
        context = ?args.context,
        "starting pipeline"
    );

    let report = batch::run(&pipeline, &args.input, &args.output)?;
    if let Some(report_path) = &args.report {
        write_report(&report, report_path)?;
    }
    println!("{}", report.summary());
    Ok(())
}

fn write_report(report: &RunReport, path: &std::path::Path) -> Result<()> {
    let text = serde_json::to_string_pretty(report).context("serialize run report")?;
    write_atomic(path, &text)?;
    tracing::info!(path = %path.display(), "wrote run report");
    Ok(())
}

/// Print a per-view summary for each file. Unreadable or non-MMIF files are
/// reported and skipped.
pub fn run_stats(args: &StatsArgs) -> Result<()> {
    let cwd = std::env::current_dir().ok();
    for path in &args.files {
        let name = display_path(path, cwd.as_deref());
        let document = fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))
            .and_then(|text| Document::parse(&text));
        match document {
            Ok(document) => println!("{}", render_stats(&name, &document)),
            Err(err) => tracing::warn!(file = %name, error = %format!("{err:#}"), "skipping"),
        }
    }
    Ok(())
}
