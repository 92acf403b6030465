//! Store errors.

use std::path::PathBuf;

use varcache_backend::BackendError;
use varcache_codec::CodecError;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The key contains `=` or a line break. Nothing was read or written.
    #[error("{0}")]
    InvalidKey(#[source] CodecError),

    /// The file exists but is not a valid variables file.
    #[error("failed to decode {path}: {source}")]
    DecodeFailed {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    /// The file exists but could not be read or stat'ed.
    #[error("{0}")]
    ReadFailed(#[source] BackendError),

    /// The namespace directory or the file could not be created.
    #[error("failed to initialize variables: {0}")]
    InitFailed(#[source] BackendError),

    /// Another writer replaced the file after it was loaded. Nothing was
    /// written; reload and try again.
    #[error("{path} was modified by another writer; retry the update")]
    ConcurrentModification { path: PathBuf },

    /// The new contents could not be written into place.
    #[error("{0}")]
    WriteFailed(#[source] BackendError),

    /// The platform has no user cache directory.
    #[error("no user cache directory is available on this platform")]
    NoCacheDir,
}

impl StoreError {
    /// Whether this is a [`StoreError::ConcurrentModification`], the one
    /// error a caller is expected to retry.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::ConcurrentModification { .. })
    }
}
