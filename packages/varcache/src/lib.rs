//! varcache: persistent variables in a plain text file.
//!
//! A cross-platform alternative to environment variables for command-line
//! programs. Each program (namespace) gets one `key=value` file under the
//! user's cache directory, and independent invocations may update it
//! concurrently without corrupting it or losing updates silently.
//!
//! The layers, bottom up:
//!
//! - [`codec`] - the line format, with escaping. No I/O.
//! - [`backend`] - whole-file reads, atomic writes and stamps. No format.
//! - [`store`] - [`VarStore`], which ties the two together with an
//!   optimistic write protocol.
//!
//! ```rust
//! use varcache::{key, Location, VarStore};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let mut vars = VarStore::new(Location::new(dir.path(), "mytool", varcache::DEFAULT_FILE_NAME));
//! vars.init().unwrap();
//!
//! let token = key::qualify("mytool.github", "token");
//! vars.set(&token, "s3cr3t").unwrap();
//! assert_eq!(vars.get("mytool.github.token").unwrap(), "s3cr3t");
//! ```

pub use varcache_backend as backend;
pub use varcache_codec as codec;
pub use varcache_store as store;

pub use varcache_store::{
    key, retry, Entries, Location, PendingWrite, StoreError, VarStore, DEFAULT_FILE_NAME,
};
