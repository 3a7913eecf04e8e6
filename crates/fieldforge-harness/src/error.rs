//! Harness error types.

use std::path::PathBuf;

use fieldforge_mesh::{MeshMismatch, ObjError};
use thiserror::Error;

/// Error type returned by a [`CaseRunner`](crate::CaseRunner).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that stop the harness itself.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("tests directory not found: {0}")]
    MissingTestsDir(PathBuf),

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Only generated `.obj` outputs can be accepted.
    #[error("not a generated .obj output: {0}")]
    NotAnOutput(PathBuf),

    #[error("file not found: {0}")]
    MissingOutput(PathBuf),
}

/// Why one test case failed.
#[derive(Debug, Error)]
pub enum CaseFailure {
    #[error("ground truth file missing: {0}")]
    MissingGroundTruth(PathBuf),

    #[error("generated output missing: {0}")]
    MissingOutput(PathBuf),

    #[error("could not read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: ObjError,
    },

    #[error("could not produce output: {0}")]
    Runner(#[source] BoxError),

    #[error(transparent)]
    Mismatch(#[from] MeshMismatch),
}

/// Why the host export command did not produce an output.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to clear stale output {path}: {source}")]
    ClearOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("export of {case} exited with {status}: {stderr}")]
    Failed {
        case: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}
