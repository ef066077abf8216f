//! Error types for the pftree engine.
//!
//! Node-local failures (a failed analysis, a filtered-out directory, an
//! unreadable file during sizing) never surface here; they are absorbed by
//! pruning the node. Everything in this module aborts the run.

use crate::pipeline::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error for a pftree run.
#[derive(Error, Debug)]
pub enum TreeError {
    /// The input directory is missing; raised before any traversal.
    #[error("input directory '{}' not found; this is a required input", .0.display())]
    InputRootMissing(PathBuf),

    /// The configuration was rejected during validation.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The pipeline aborted.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Configuration rejected at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Filter logic other than `AND` / `OR`.
    #[error("invalid filter logic '{0}', expected AND or OR")]
    InvalidLogic(String),

    /// The output leaf format must contain exactly one `%s` placeholder.
    #[error("invalid output leaf format '{format}': {reason}")]
    LeafFormat { format: String, reason: String },

    /// Thread count beyond the supported maximum.
    #[error("thread count {requested} exceeds the maximum of {max}")]
    TooManyThreads { requested: usize, max: usize },

    /// An empty apply key would select nothing.
    #[error("apply key must not be empty")]
    EmptyApplyKey,

    /// Malformed `--test` specification.
    #[error("invalid test spec '{0}', expected <delay>[:<mode>] with mode 0 or 1")]
    TestSpec(String),

    /// The built-in listing stages need somewhere to write.
    #[error("an output directory is required when running the listing stages")]
    MissingOutputRoot,
}

/// Fatal pipeline failures.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A stage returned something that is not a valid stage result.
    #[error("{stage} stage broke its contract at '{}': {reason}", .path.display())]
    ContractViolation {
        stage: Stage,
        path: PathBuf,
        reason: String,
    },

    /// A read or write callback failed; these are not recovered per node.
    #[error("{stage} stage failed at '{}'", .path.display())]
    StageFailed {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// The analysis worker pool could not be created.
    #[error("failed to build analysis thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Error returned by a stage callback.
#[derive(Error, Debug)]
pub enum StageError {
    /// The callback produced a result without a boolean `status`.
    #[error("stage result has no boolean `status` field")]
    MissingStatus,

    /// The callback itself failed.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl From<std::io::Error> for StageError {
    fn from(err: std::io::Error) -> Self {
        StageError::Failed(err.into())
    }
}

impl From<serde_json::Error> for StageError {
    fn from(err: serde_json::Error) -> Self {
        StageError::Failed(err.into())
    }
}
