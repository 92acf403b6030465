//! Core traits for the backend layer.

use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;

use crate::BackendError;

/// What a file looked like when it was last inspected.
///
/// Two stamps taken from the same path compare equal only if nothing
/// replaced the file in between, as far as the backend can tell.
/// `identity` is the inode number on Unix, which changes on every
/// rename-based write even when the modification time does not; elsewhere
/// it is 0 and comparison falls back to `modified` and `len`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stamp {
    /// Last modification time, if the platform reports one.
    pub modified: Option<SystemTime>,
    /// Size in bytes.
    pub len: u64,
    /// Backend-specific identity of the underlying file.
    pub identity: u64,
}

/// Whole-file access to a single path.
///
/// Implementations must guarantee that a reader never observes a
/// partially written file.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Box<dyn FileBackend>`.
pub trait FileBackend: Send + Sync {
    /// Read the whole file.
    ///
    /// A file that does not exist reads as empty bytes, not an error.
    fn read_all(&self, path: &Path) -> Result<Bytes, BackendError>;

    /// Stat the file.
    ///
    /// * `Ok(None)` - the file does not exist.
    /// * `Ok(Some(stamp))` - the file exists.
    fn stat(&self, path: &Path) -> Result<Option<Stamp>, BackendError>;

    /// Replace the file's contents all at once.
    fn atomic_write(&self, path: &Path, data: Bytes) -> Result<(), BackendError>;

    /// Like [`FileBackend::atomic_write`], but only if the file's stamp still
    /// equals `expected` (`None`: the file must not exist).
    ///
    /// The stamp is compared once the new contents are ready to be moved into
    /// place, as close to the replacement as the backend allows. On a
    /// mismatch the file is left alone and [`BackendError::Changed`] is
    /// returned.
    fn atomic_write_if(
        &self,
        path: &Path,
        data: Bytes,
        expected: Option<Stamp>,
    ) -> Result<(), BackendError>;

    /// Create a directory and its parents. Succeeds if it already exists.
    fn ensure_dir(&self, path: &Path) -> Result<(), BackendError>;

    /// Create an empty file if none exists. Existing contents are kept.
    fn ensure_file(&self, path: &Path) -> Result<(), BackendError>;
}

impl<T: FileBackend + ?Sized> FileBackend for &T {
    fn read_all(&self, path: &Path) -> Result<Bytes, BackendError> {
        (**self).read_all(path)
    }

    fn stat(&self, path: &Path) -> Result<Option<Stamp>, BackendError> {
        (**self).stat(path)
    }

    fn atomic_write(&self, path: &Path, data: Bytes) -> Result<(), BackendError> {
        (**self).atomic_write(path, data)
    }

    fn atomic_write_if(
        &self,
        path: &Path,
        data: Bytes,
        expected: Option<Stamp>,
    ) -> Result<(), BackendError> {
        (**self).atomic_write_if(path, data, expected)
    }

    fn ensure_dir(&self, path: &Path) -> Result<(), BackendError> {
        (**self).ensure_dir(path)
    }

    fn ensure_file(&self, path: &Path) -> Result<(), BackendError> {
        (**self).ensure_file(path)
    }
}

impl<T: FileBackend + ?Sized> FileBackend for Box<T> {
    fn read_all(&self, path: &Path) -> Result<Bytes, BackendError> {
        self.as_ref().read_all(path)
    }

    fn stat(&self, path: &Path) -> Result<Option<Stamp>, BackendError> {
        self.as_ref().stat(path)
    }

    fn atomic_write(&self, path: &Path, data: Bytes) -> Result<(), BackendError> {
        self.as_ref().atomic_write(path, data)
    }

    fn atomic_write_if(
        &self,
        path: &Path,
        data: Bytes,
        expected: Option<Stamp>,
    ) -> Result<(), BackendError> {
        self.as_ref().atomic_write_if(path, data, expected)
    }

    fn ensure_dir(&self, path: &Path) -> Result<(), BackendError> {
        self.as_ref().ensure_dir(path)
    }

    fn ensure_file(&self, path: &Path) -> Result<(), BackendError> {
        self.as_ref().ensure_file(path)
    }
}

impl<T: FileBackend + ?Sized> FileBackend for Arc<T> {
    fn read_all(&self, path: &Path) -> Result<Bytes, BackendError> {
        self.as_ref().read_all(path)
    }

    fn stat(&self, path: &Path) -> Result<Option<Stamp>, BackendError> {
        self.as_ref().stat(path)
    }

    fn atomic_write(&self, path: &Path, data: Bytes) -> Result<(), BackendError> {
        self.as_ref().atomic_write(path, data)
    }

    fn atomic_write_if(
        &self,
        path: &Path,
        data: Bytes,
        expected: Option<Stamp>,
    ) -> Result<(), BackendError> {
        self.as_ref().atomic_write_if(path, data, expected)
    }

    fn ensure_dir(&self, path: &Path) -> Result<(), BackendError> {
        self.as_ref().ensure_dir(path)
    }

    fn ensure_file(&self, path: &Path) -> Result<(), BackendError> {
        self.as_ref().ensure_file(path)
    }
}
