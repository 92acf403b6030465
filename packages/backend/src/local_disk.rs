//! The real filesystem.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tempfile::NamedTempFile;

use crate::{BackendError, FileBackend, Stamp};

/// Files on the local disk.
///
/// Writes go to a temporary file in the target's directory, which is synced
/// and then renamed over the target. If the process dies before the rename
/// the target is untouched and only a stray `.varcache-*` temp file remains.
///
/// [`FileBackend::atomic_write_if`] compares the stamp after the temp file is
/// synced, immediately before the rename. Within one process the compare and
/// the rename run under a shared mutex, so writers in the same process cannot
/// interleave there. Between processes the stat-to-rename gap is the only
/// unprotected window.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalDisk;

/// Serializes compare-and-rename among writers in this process.
static RENAME: Mutex<()> = Mutex::new(());

impl LocalDisk {
    pub fn new() -> Self {
        Self
    }

    /// Write `data` to a synced temp file next to `path`.
    fn stage(&self, path: &Path, data: &[u8]) -> Result<NamedTempFile, BackendError> {
        log::debug!("Writing {} ({} bytes)...", path.display(), data.len());

        let write_error = |source| BackendError::Write {
            path: path.to_path_buf(),
            source,
        };

        // The temp file must live on the same filesystem for the rename to be atomic.
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = tempfile::Builder::new()
            .prefix(".varcache-")
            .tempfile_in(dir)
            .map_err(write_error)?;
        tmp.write_all(data).map_err(write_error)?;
        tmp.as_file().sync_all().map_err(write_error)?;
        Ok(tmp)
    }

    fn rename_into_place(&self, tmp: NamedTempFile, path: &Path) -> Result<(), BackendError> {
        tmp.persist(path).map_err(|err| BackendError::Write {
            path: path.to_path_buf(),
            source: err.error,
        })?;
        Ok(())
    }
}

fn lock_rename() -> MutexGuard<'static, ()> {
    RENAME.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(unix)]
fn identity(metadata: &fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.ino()
}

#[cfg(not(unix))]
fn identity(_metadata: &fs::Metadata) -> u64 {
    0
}

impl FileBackend for LocalDisk {
    fn read_all(&self, path: &Path) -> Result<Bytes, BackendError> {
        log::debug!("Reading {}...", path.display());
        match fs::read(path) {
            Ok(data) => Ok(Bytes::from(data)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(Bytes::new()),
            Err(source) => Err(BackendError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn stat(&self, path: &Path) -> Result<Option<Stamp>, BackendError> {
        log::debug!("Stat {}...", path.display());
        match fs::metadata(path) {
            Ok(metadata) => Ok(Some(Stamp {
                modified: metadata.modified().ok(),
                len: metadata.len(),
                identity: identity(&metadata),
            })),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(BackendError::Stat {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn atomic_write(&self, path: &Path, data: Bytes) -> Result<(), BackendError> {
        let tmp = self.stage(path, &data)?;
        let _guard = lock_rename();
        self.rename_into_place(tmp, path)
    }

    fn atomic_write_if(
        &self,
        path: &Path,
        data: Bytes,
        expected: Option<Stamp>,
    ) -> Result<(), BackendError> {
        let tmp = self.stage(path, &data)?;

        let _guard = lock_rename();
        if self.stat(path)? != expected {
            log::debug!("{} changed since it was read", path.display());
            // Dropping `tmp` removes the staged file.
            return Err(BackendError::Changed {
                path: path.to_path_buf(),
            });
        }
        self.rename_into_place(tmp, path)
    }

    fn ensure_dir(&self, path: &Path) -> Result<(), BackendError> {
        fs::create_dir_all(path).map_err(|source| BackendError::CreateDir {
            path: path.to_path_buf(),
            source,
        })
    }

    fn ensure_file(&self, path: &Path) -> Result<(), BackendError> {
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(_) => {
                log::debug!("Created empty {}", path.display());
                Ok(())
            }
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(source) => Err(BackendError::CreateFile {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
