//! Batch driver: one input file, or every file directly inside a directory.
use crate::client::ServiceClient;
use crate::error::PipelineError;
use crate::pipeline::{FileReport, FileStatus, Pipeline};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub files: Vec<FileReport>,
}

impl RunReport {
    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|file| file.status == status).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "processed {} file(s): {} completed, {} aborted, {} skipped, {} failed",
            self.files.len(),
            self.count(FileStatus::Completed),
            self.count(FileStatus::Aborted),
            self.count(FileStatus::Skipped),
            self.count(FileStatus::Failed),
        )
    }
}

/// Checks that must pass before any file is touched.
pub fn preflight(input: &Path, output: &Path) -> Result<()> {
    if !input.exists() {
        return Err(PipelineError::MissingInput(input.to_path_buf()).into());
    }
    if output.exists() {
        return Err(PipelineError::OutputCollision(output.to_path_buf()).into());
    }
    Ok(())
}

/// Run `pipeline` over `input`, writing to `output`.
///
/// In directory mode `output` is created as a directory and each file keeps
/// its name. A fault on one file is logged and recorded; the rest still run.
pub fn run<C: ServiceClient>(
    pipeline: &Pipeline<C>,
    input: &Path,
    output: &Path,
) -> Result<RunReport> {
    preflight(input, output)?;
    let mut report = RunReport::default();
    if input.is_file() {
        report.files.push(pipeline.run_file(input, output)?);
    } else if input.is_dir() {
        fs::create_dir(output).with_context(|| format!("create {}", output.display()))?;
        for infile in input_files(input)? {
            let Some(name) = infile.file_name() else {
                continue;
            };
            let outfile = output.join(name);
            let file_report = match pipeline.run_file(&infile, &outfile) {
                Ok(file_report) => file_report,
                Err(err) => {
                    tracing::warn!(
                        file = %infile.display(),
                        error = %format!("{err:#}"),
                        "error processing file"
                    );
                    FileReport::failed(&infile, format!("{err:#}"))
                }
            };
            report.files.push(file_report);
        }
    } else {
        bail!("{} is neither a file nor a directory", input.display());
    }
    Ok(report)
}

/// Regular files directly inside `dir`, sorted by path.
fn input_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
