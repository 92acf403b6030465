//! Error types for the backend layer.
//!
//! Every variant names the operation and the path it was applied to, and
//! keeps the underlying I/O error as its source.

use std::io;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A conditional write found the file replaced, created or removed since
    /// its stamp was taken. Nothing was written.
    #[error("{path} changed since it was read")]
    Changed { path: PathBuf },

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create file {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl BackendError {
    /// The path the failed operation was applied to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            BackendError::Read { path, .. }
            | BackendError::Stat { path, .. }
            | BackendError::Write { path, .. }
            | BackendError::Changed { path }
            | BackendError::CreateDir { path, .. }
            | BackendError::CreateFile { path, .. } => path,
        }
    }
}
