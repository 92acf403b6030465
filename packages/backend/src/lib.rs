//! varcache-backend: whole-file storage for varcache.
//!
//! Everything at this level is pure bytes. A backend reads a whole file,
//! replaces a whole file atomically, reports a [`Stamp`] that changes
//! whenever the file does, and creates directories and empty files on
//! request. It knows nothing about the `key=value` format.
//!
//! Two implementations are provided:
//!
//! - [`LocalDisk`] - the real filesystem, with write-to-temp-then-rename
//! - [`MemoryBackend`] - shared in-process files, for tests
//!
//! # Example
//!
//! ```rust
//! use varcache_backend::{FileBackend, MemoryBackend};
//! use bytes::Bytes;
//! use std::path::Path;
//!
//! let backend = MemoryBackend::new();
//! let path = Path::new("cache/foo/vars");
//!
//! assert!(backend.stat(path).unwrap().is_none());
//! assert!(backend.read_all(path).unwrap().is_empty());
//!
//! backend.ensure_dir(Path::new("cache/foo")).unwrap();
//! backend.atomic_write(path, Bytes::from_static(b"a=1\n")).unwrap();
//! assert_eq!(backend.read_all(path).unwrap(), Bytes::from_static(b"a=1\n"));
//! ```

pub use bytes::Bytes;

mod error;
mod local_disk;
mod memory;
mod traits;

pub use error::BackendError;
pub use local_disk::LocalDisk;
pub use memory::MemoryBackend;
pub use traits::{FileBackend, Stamp};
