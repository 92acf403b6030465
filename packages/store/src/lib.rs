//! varcache-store: a persistent, namespaced variable store.
//!
//! Variables live in one text file per namespace at
//! `<base dir>/<namespace>/<file name>`, written in the format of
//! [`varcache_codec`]. Any number of independent processes may read and
//! write the same file. Writers never lock; instead each write checks that
//! the file is unchanged since it was loaded and refuses with
//! [`StoreError::ConcurrentModification`] if it is not, so that no update is
//! silently clobbered. Retrying is up to the caller (see [`retry`]).
//!
//! Keys are opaque to the store. Callers sharing a file keep apart by
//! prefixing keys with their own path (see [`key::qualify`]).
//!
//! # Example
//!
//! ```rust
//! use varcache_store::{Location, VarStore};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let mut store = VarStore::new(Location::new(dir.path(), "foo", "cache"));
//! store.init().unwrap();
//!
//! store.set("some", "thing\nhere").unwrap();
//! assert_eq!(store.get("some").unwrap(), "thing\nhere");
//! assert_eq!(&store.raw_contents().unwrap()[..], b"some=thing\\nhere\n");
//! assert_eq!(store.get("missing").unwrap(), "");
//! ```

mod error;
pub mod key;
mod location;
pub mod retry;
mod store;

pub use error::StoreError;
pub use location::{Location, DEFAULT_FILE_NAME};
pub use store::{PendingWrite, VarStore};

pub use varcache_backend::{FileBackend, LocalDisk, MemoryBackend, Stamp};
pub use varcache_codec::Entries;
