//! In-process files.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;

use crate::{BackendError, FileBackend, Stamp};

#[derive(Default)]
struct Files {
    files: HashMap<PathBuf, MemoryFile>,
    dirs: HashSet<PathBuf>,
    generation: u64,
    fail_writes: bool,
}

struct MemoryFile {
    data: Bytes,
    generation: u64,
}

/// A backend that keeps files in memory.
///
/// Clones share the same files, so two store handles built on clones of one
/// `MemoryBackend` behave like two processes sharing a disk. Every write
/// bumps a global generation counter, which stands in for the modification
/// time in [`Stamp::identity`].
///
/// Directories are tracked only so that [`FileBackend::ensure_dir`] and
/// [`FileBackend::ensure_file`] behave like their disk counterparts.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Files>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (or succeed again). Existing contents
    /// are never touched by a failed write.
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Whether a directory was created with [`FileBackend::ensure_dir`].
    pub fn dir_exists(&self, path: &Path) -> bool {
        self.lock().dirs.contains(path)
    }

    fn lock(&self) -> MutexGuard<'_, Files> {
        // A panic while holding the lock cannot leave a file half written.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Files {
    fn parent_exists(&self, path: &Path) -> bool {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => self.dirs.contains(parent),
            _ => true,
        }
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn stamp(&self, path: &Path) -> Option<Stamp> {
        self.files.get(path).map(|f| Stamp {
            modified: None,
            len: f.data.len() as u64,
            identity: f.generation,
        })
    }

    fn write(&mut self, path: &Path, data: Bytes) -> Result<(), BackendError> {
        if self.fail_writes {
            return Err(BackendError::Write {
                path: path.to_path_buf(),
                source: io::Error::other("writes disabled"),
            });
        }
        if !self.parent_exists(path) {
            return Err(BackendError::Write {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }
        let generation = self.next_generation();
        self.files
            .insert(path.to_path_buf(), MemoryFile { data, generation });
        Ok(())
    }
}

impl FileBackend for MemoryBackend {
    fn read_all(&self, path: &Path) -> Result<Bytes, BackendError> {
        Ok(self
            .lock()
            .files
            .get(path)
            .map(|f| f.data.clone())
            .unwrap_or_default())
    }

    fn stat(&self, path: &Path) -> Result<Option<Stamp>, BackendError> {
        Ok(self.lock().stamp(path))
    }

    fn atomic_write(&self, path: &Path, data: Bytes) -> Result<(), BackendError> {
        self.lock().write(path, data)
    }

    fn atomic_write_if(
        &self,
        path: &Path,
        data: Bytes,
        expected: Option<Stamp>,
    ) -> Result<(), BackendError> {
        // Check and replace under one lock: nothing can slip in between.
        let mut files = self.lock();
        if files.stamp(path) != expected {
            return Err(BackendError::Changed {
                path: path.to_path_buf(),
            });
        }
        files.write(path, data)
    }

    fn ensure_dir(&self, path: &Path) -> Result<(), BackendError> {
        let mut files = self.lock();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            files.dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }

    fn ensure_file(&self, path: &Path) -> Result<(), BackendError> {
        let mut files = self.lock();
        if files.files.contains_key(path) {
            return Ok(());
        }
        if !files.parent_exists(path) {
            return Err(BackendError::CreateFile {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }
        let generation = files.next_generation();
        files.files.insert(
            path.to_path_buf(),
            MemoryFile {
                data: Bytes::new(),
                generation,
            },
        );
        Ok(())
    }
}
