//! Error taxonomy for pipeline runs.
//!
//! Only run-level and file-level failures are errors. Per-step failures are
//! classified into [`crate::classify::Outcome`] values and recovered inside the
//! executor, so they never show up here.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("output path {} already exists", .0.display())]
    OutputCollision(PathBuf),

    #[error("input path {} does not exist", .0.display())]
    MissingInput(PathBuf),

    #[error("unknown service {0:?} in pipeline")]
    UnknownService(String),

    #[error("{} is not a valid MMIF document: {reason}", .path.display())]
    InvalidInput { path: PathBuf, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}
