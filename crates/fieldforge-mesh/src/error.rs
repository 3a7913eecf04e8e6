//! Error types for OBJ reading and writing.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing OBJ files.
#[derive(Debug, Error)]
pub enum ObjError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// A `v` or `f` record could not be parsed.
    #[error("line {line}: {message}")]
    InvalidRecord { line: usize, message: String },

    /// A face names a vertex that does not exist.
    #[error("line {line}: face index {index} is out of range ({vertex_count} vertices)")]
    IndexOutOfRange {
        line: usize,
        index: i64,
        vertex_count: usize,
    },

    /// I/O error while reading or writing `path`.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ObjError {
    pub(crate) fn invalid(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound { path }
        } else {
            Self::Io { path, source }
        }
    }
}
