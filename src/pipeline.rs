//! Per-file pipeline execution.
//!
//! Each step moves through invoke, classify, then accept or synthesize:
//!
//! - a clean success, or a reported error whose body is a valid document
//!   (the service wrote its own error view), is accepted as-is;
//! - anything else gets an error view appended to the document the step was
//!   given, so a malformed response never becomes the next step's input.
//!
//! With `abort_on_error` the first failing step ends the run for that file;
//! either way the last document produced is written to the output path.
use crate::classify::{classify, Outcome, GENERIC_MESSAGE};
use crate::client::{ServiceClient, StatusPrimitive};
use crate::endpoint::ResolvedEndpoint;
use crate::error::PipelineError;
use crate::error_view::synthesize;
use crate::identity::IdentityCache;
use crate::mmif::Document;
use crate::util::{snapshot_path, truncate_string, write_atomic, write_new};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Longest slice of a rejected response body echoed into debug logs.
const BODY_PREVIEW_BYTES: usize = 200;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Write each step's output next to the final output.
    pub intermediate: bool,
    /// Stop a file's run at the first failing step.
    pub abort_on_error: bool,
    /// Pretty-print documents the orchestrator serializes itself.
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Accepted,
    Synthesized,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub index: usize,
    pub service: String,
    pub identity: String,
    pub outcome: Outcome,
    pub message: Option<String>,
    pub disposition: Disposition,
    pub elapsed_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Completed,
    Aborted,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub status: FileStatus,
    pub message: Option<String>,
    pub steps: Vec<StepRecord>,
    /// Seconds per service identity; a repeated identity keeps its last step.
    pub timings: BTreeMap<String, f64>,
}

impl FileReport {
    pub fn skipped(input: &Path, message: String) -> Self {
        Self::empty(input, FileStatus::Skipped, message)
    }

    pub fn failed(input: &Path, message: String) -> Self {
        Self::empty(input, FileStatus::Failed, message)
    }

    fn empty(input: &Path, status: FileStatus, message: String) -> Self {
        Self {
            input: input.to_path_buf(),
            output: None,
            status,
            message: Some(message),
            steps: Vec::new(),
            timings: BTreeMap::new(),
        }
    }
}

struct StepOutput {
    record: StepRecord,
    failed: bool,
    document: Document,
    text: String,
}

/// An ordered list of resolved services plus the state shared across files.
pub struct Pipeline<C> {
    client: C,
    endpoints: Vec<ResolvedEndpoint>,
    identities: IdentityCache,
    options: RunOptions,
}

impl<C: ServiceClient> Pipeline<C> {
    pub fn new(client: C, endpoints: Vec<ResolvedEndpoint>, options: RunOptions) -> Self {
        Self {
            client,
            endpoints,
            identities: IdentityCache::new(),
            options,
        }
    }

    pub fn endpoints(&self) -> &[ResolvedEndpoint] {
        &self.endpoints
    }

    /// Run every step over `input` and write the final document to `output`.
    ///
    /// Inputs that are not MMIF are skipped without writing anything. Errors
    /// are only returned for local faults (unreadable input, unwritable
    /// output).
    pub fn run_file(&self, input: &Path, output: &Path) -> Result<FileReport> {
        tracing::info!(input = %input.display(), "processing file");
        let text =
            fs::read_to_string(input).with_context(|| format!("read {}", input.display()))?;
        let mut current = match Document::parse(&text) {
            Ok(document) => document,
            Err(err) => {
                let diagnostic = PipelineError::InvalidInput {
                    path: input.to_path_buf(),
                    reason: format!("{err:#}"),
                };
                tracing::warn!("{diagnostic}; skipping");
                return Ok(FileReport::skipped(input, diagnostic.to_string()));
            }
        };
        let mut current_text = text;

        let mut status = FileStatus::Completed;
        let mut steps = Vec::with_capacity(self.endpoints.len());
        let mut timings = BTreeMap::new();
        for (offset, endpoint) in self.endpoints.iter().enumerate() {
            let step = self.run_step(offset + 1, endpoint, &current, &current_text)?;
            tracing::info!(
                identity = %step.record.identity,
                seconds = step.record.elapsed_secs,
                "step timing"
            );
            timings.insert(step.record.identity.clone(), step.record.elapsed_secs);
            if self.options.intermediate {
                let path = snapshot_path(output, step.record.index, &endpoint.service);
                if !write_new(&path, &step.text)? {
                    tracing::warn!(
                        path = %path.display(),
                        "snapshot path already exists; not saving snapshot"
                    );
                }
            }
            let failed = step.failed;
            current = step.document;
            current_text = step.text;
            steps.push(step.record);
            if failed && self.options.abort_on_error {
                tracing::warn!(
                    service = %endpoint.service,
                    remaining = self.endpoints.len() - offset - 1,
                    "aborting pipeline after failed step"
                );
                status = FileStatus::Aborted;
                break;
            }
        }

        write_atomic(output, &current_text)?;
        tracing::info!(output = %output.display(), "wrote output");
        Ok(FileReport {
            input: input.to_path_buf(),
            output: Some(output.to_path_buf()),
            status,
            message: None,
            steps,
            timings,
        })
    }

    fn run_step(
        &self,
        index: usize,
        endpoint: &ResolvedEndpoint,
        current: &Document,
        current_text: &str,
    ) -> Result<StepOutput> {
        tracing::info!(step = index, service = %endpoint.service, "running service");
        let identity = self.identities.resolve(&self.client, endpoint);
        let started = Instant::now();

        let invocation = self.client.invoke(endpoint, current_text);
        let parsed = match invocation.status {
            StatusPrimitive::Http(_) => Document::parse(&invocation.body).ok(),
            StatusPrimitive::TransportFailure | StatusPrimitive::InternalFailure => None,
        };
        let classification = classify(invocation.status, parsed.is_some(), &invocation.body);

        let (document, text, disposition) = match (classification.message.as_deref(), parsed) {
            (None, Some(document)) => {
                let unmarked = !document.last_view_has_error();
                if classification.outcome == Outcome::ServiceReported && unmarked {
                    tracing::warn!(
                        service = %endpoint.service,
                        status = ?invocation.status,
                        "service reported an error without an error view"
                    );
                }
                (document, invocation.body, Disposition::Accepted)
            }
            (message, _) => {
                let message = message.unwrap_or(GENERIC_MESSAGE);
                tracing::warn!(
                    service = %endpoint.service,
                    outcome = ?classification.outcome,
                    error_message = message,
                    "adding error view"
                );
                tracing::debug!(
                    body = %truncate_string(&invocation.body, BODY_PREVIEW_BYTES),
                    "rejected response"
                );
                let document = synthesize(current, &identity, message);
                let text = document.serialize(self.options.pretty)?;
                (document, text, Disposition::Synthesized)
            }
        };

        let failed = classification.is_error();
        let record = StepRecord {
            index,
            service: endpoint.service.clone(),
            identity,
            outcome: classification.outcome,
            message: classification.message,
            disposition,
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        Ok(StepOutput {
            record,
            failed,
            document,
            text,
        })
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
