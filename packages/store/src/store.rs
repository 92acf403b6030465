use std::path::PathBuf;

use bytes::Bytes;
use varcache_backend::{BackendError, FileBackend, LocalDisk, Stamp};
use varcache_codec::{self as codec, Entries};

use crate::{Location, StoreError};

/// A persistent, namespaced map of string variables.
///
/// The file on disk is the source of truth. Every operation re-reads it, and
/// every write goes through the optimistic protocol in [`VarStore::begin`] /
/// [`VarStore::commit`]: the file's [`Stamp`] is recorded before loading and
/// checked again by the backend once the new contents are staged, right
/// before they replace the file. If another writer got in between, the
/// write is refused with [`StoreError::ConcurrentModification`].
///
/// There are no file locks. With [`LocalDisk`], a write from another process
/// that lands between that final stat and the rename can still be lost;
/// that gap is the only unprotected window.
///
/// Calls take `&mut self`; share a store across threads behind a mutex, or
/// give each thread its own handle.
pub struct VarStore<B: FileBackend = LocalDisk> {
    location: Location,
    backend: B,
    entries: Entries,
}

/// A snapshot taken by [`VarStore::begin`], to be mutated and handed to
/// [`VarStore::commit`].
#[derive(Clone, Debug)]
pub struct PendingWrite {
    observed: Option<Stamp>,
    entries: Entries,
    changed: bool,
}

impl PendingWrite {
    /// Set `key` to `value`. Fails with [`StoreError::InvalidKey`] if the
    /// key cannot be persisted.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<&mut Self, StoreError> {
        let key = key.into();
        codec::key::validate(&key).map_err(StoreError::InvalidKey)?;
        self.entries.insert(key, value.into());
        self.changed = true;
        Ok(self)
    }

    /// Remove `key`. Removing an absent key is not a change.
    pub fn remove(&mut self, key: &str) -> &mut Self {
        if self.entries.remove(key).is_some() {
            self.changed = true;
        }
        self
    }

    pub fn entries(&self) -> &Entries {
        &self.entries
    }

    /// Whether anything was set or removed since [`VarStore::begin`].
    pub fn is_changed(&self) -> bool {
        self.changed
    }
}

impl VarStore<LocalDisk> {
    /// A store on the local disk.
    pub fn new(location: Location) -> Self {
        Self::with_backend(location, LocalDisk::new())
    }
}

impl<B: FileBackend> VarStore<B> {
    pub fn with_backend(location: Location, backend: B) -> Self {
        Self {
            location,
            backend,
            entries: Entries::new(),
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Full path of the variables file.
    pub fn path(&self) -> PathBuf {
        self.location.path()
    }

    /// Directory holding the variables file.
    pub fn dir_path(&self) -> PathBuf {
        self.location.dir_path()
    }

    /// The entries as of the most recent successful read.
    pub fn entries(&self) -> &Entries {
        &self.entries
    }

    /// Create the namespace directory and an empty file if they are missing.
    /// Existing data is kept.
    pub fn init(&mut self) -> Result<(), StoreError> {
        self.backend
            .ensure_dir(&self.dir_path())
            .map_err(StoreError::InitFailed)?;
        self.backend
            .ensure_file(&self.path())
            .map_err(StoreError::InitFailed)?;
        log::info!("Initialized {}", self.path().display());
        Ok(())
    }

    /// Create the namespace directory and replace the file with an empty one,
    /// discarding every variable. Callers are expected to confirm first.
    pub fn reinitialize(&mut self) -> Result<(), StoreError> {
        self.backend
            .ensure_dir(&self.dir_path())
            .map_err(StoreError::InitFailed)?;
        self.backend
            .atomic_write(&self.path(), Bytes::new())
            .map_err(StoreError::InitFailed)?;
        self.entries.clear();
        log::info!("Reinitialized {}", self.path().display());
        Ok(())
    }

    /// Reload the file and return every entry.
    pub fn load(&mut self) -> Result<&Entries, StoreError> {
        self.entries = self.read_entries()?;
        Ok(&self.entries)
    }

    /// Reload the file and look up `key`. An unset key is `""`, not an error.
    pub fn get(&mut self, key: &str) -> Result<String, StoreError> {
        Ok(self.load()?.get(key).cloned().unwrap_or_default())
    }

    /// Persist `key = value`.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), StoreError> {
        let key = key.into();
        codec::key::validate(&key).map_err(StoreError::InvalidKey)?;

        let mut pending = self.begin()?;
        pending.set(key, value)?;
        self.commit(pending)
    }

    /// Remove `key`. An absent key is left alone and nothing is written.
    pub fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        let mut pending = self.begin()?;
        pending.remove(key);
        self.commit(pending)
    }

    /// The file's bytes exactly as they are on disk, without decoding.
    /// A missing file reads as empty.
    pub fn raw_contents(&self) -> Result<Bytes, StoreError> {
        self.backend
            .read_all(&self.path())
            .map_err(StoreError::ReadFailed)
    }

    /// Record the file's stamp, then load it into a fresh snapshot.
    pub fn begin(&mut self) -> Result<PendingWrite, StoreError> {
        let observed = self.stat()?;
        let entries = self.read_entries()?;
        self.entries = entries.clone();
        Ok(PendingWrite {
            observed,
            entries,
            changed: false,
        })
    }

    /// Write `pending` back if the file is unchanged since it was loaded.
    ///
    /// An unchanged snapshot is not written at all. Otherwise the backend
    /// compares the stamp from [`VarStore::begin`] right before moving the
    /// new contents into place, and if the file was replaced, created or
    /// removed in the meantime nothing is written and
    /// [`StoreError::ConcurrentModification`] is returned.
    pub fn commit(&mut self, pending: PendingWrite) -> Result<(), StoreError> {
        if !pending.changed {
            return Ok(());
        }

        let data = Bytes::from(codec::encode(&pending.entries));
        match self
            .backend
            .atomic_write_if(&self.path(), data, pending.observed)
        {
            Ok(()) => {
                self.entries = pending.entries;
                Ok(())
            }
            Err(BackendError::Changed { path }) => {
                log::warn!("{} changed since it was read, not writing", path.display());
                Err(StoreError::ConcurrentModification { path })
            }
            Err(err @ BackendError::Stat { .. }) => Err(StoreError::ReadFailed(err)),
            Err(err) => Err(StoreError::WriteFailed(err)),
        }
    }

    fn stat(&self) -> Result<Option<Stamp>, StoreError> {
        self.backend
            .stat(&self.path())
            .map_err(StoreError::ReadFailed)
    }

    fn read_entries(&self) -> Result<Entries, StoreError> {
        let data = self.raw_contents()?;
        codec::decode(&data).map_err(|source| StoreError::DecodeFailed {
            path: self.path(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use varcache_backend::MemoryBackend;

    fn memory_store(backend: &MemoryBackend) -> VarStore<MemoryBackend> {
        let mut store =
            VarStore::with_backend(Location::new("cache", "foo", "vars"), backend.clone());
        store.init().unwrap();
        store
    }

    #[test]
    fn init_creates_empty_file() {
        let backend = MemoryBackend::new();
        let store = memory_store(&backend);

        assert!(backend.dir_exists(&store.dir_path()));
        assert!(store.raw_contents().unwrap().is_empty());
    }

    #[test]
    fn init_keeps_existing_data() {
        let backend = MemoryBackend::new();
        let mut store = memory_store(&backend);
        store.set("a", "1").unwrap();

        store.init().unwrap();
        assert_eq!(store.get("a").unwrap(), "1");
    }

    #[test]
    fn reinitialize_clears_data() {
        let backend = MemoryBackend::new();
        let mut store = memory_store(&backend);
        store.set("a", "1").unwrap();

        store.reinitialize().unwrap();
        assert!(store.entries().is_empty());
        assert_eq!(store.get("a").unwrap(), "");
        assert!(store.raw_contents().unwrap().is_empty());
    }

    #[test]
    fn get_missing_is_empty() {
        let backend = MemoryBackend::new();
        let mut store = memory_store(&backend);
        assert_eq!(store.get("missing").unwrap(), "");
    }

    #[test]
    fn get_before_init_is_empty() {
        let mut store =
            VarStore::with_backend(Location::new("cache", "foo", "vars"), MemoryBackend::new());
        assert_eq!(store.get("anything").unwrap(), "");
    }

    #[test]
    fn set_then_get() {
        let backend = MemoryBackend::new();
        let mut store = memory_store(&backend);

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap(), "v");
        assert_eq!(store.entries().get("k").map(String::as_str), Some("v"));
    }

    #[test]
    fn set_sees_external_changes() {
        let backend = MemoryBackend::new();
        let mut a = memory_store(&backend);
        let mut b = memory_store(&backend);

        a.set("one", "1").unwrap();
        b.set("two", "2").unwrap();
        a.set("three", "3").unwrap();

        assert_eq!(
            a.raw_contents().unwrap(),
            Bytes::from_static(b"one=1\nthree=3\ntwo=2\n")
        );
    }

    #[test]
    fn invalid_key_is_rejected_before_io() {
        let backend = MemoryBackend::new();
        let mut store = memory_store(&backend);
        store.set("keep", "me").unwrap();
        let before = backend.stat(&store.path()).unwrap();

        // Even a failing backend is never reached.
        backend.fail_writes(true);
        let err = store.set("a=b", "x").unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
        assert_eq!(backend.stat(&store.path()).unwrap(), before);

        assert!(matches!(
            store.set("a\nb", "x"),
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn pending_set_validates_keys() {
        let backend = MemoryBackend::new();
        let mut store = memory_store(&backend);

        let mut pending = store.begin().unwrap();
        assert!(pending.set("bad=key", "x").is_err());
        assert!(!pending.is_changed());
    }

    #[test]
    fn conflicting_commit_is_refused() {
        let backend = MemoryBackend::new();
        let mut a = memory_store(&backend);
        let mut b = memory_store(&backend);

        let mut pending = a.begin().unwrap();
        pending.set("from", "a").unwrap();

        b.set("from", "b").unwrap();
        let after_b = a.raw_contents().unwrap();

        let err = a.commit(pending).unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(a.raw_contents().unwrap(), after_b);

        // A retry from the top succeeds.
        a.set("from", "a").unwrap();
        assert_eq!(b.get("from").unwrap(), "a");
    }

    #[test]
    fn file_created_after_begin_is_a_conflict() {
        let backend = MemoryBackend::new();
        let location = Location::new("cache", "foo", "vars");
        let mut a = VarStore::with_backend(location.clone(), backend.clone());
        backend.ensure_dir(&location.dir_path()).unwrap();

        let mut pending = a.begin().unwrap();
        pending.set("k", "v").unwrap();

        let mut b = VarStore::with_backend(location, backend.clone());
        b.init().unwrap();

        assert!(a.commit(pending).unwrap_err().is_conflict());
    }

    /// Lets another writer in once the write has already started.
    struct Interloper {
        inner: MemoryBackend,
    }

    impl FileBackend for Interloper {
        fn read_all(&self, path: &std::path::Path) -> Result<Bytes, BackendError> {
            self.inner.read_all(path)
        }

        fn stat(&self, path: &std::path::Path) -> Result<Option<Stamp>, BackendError> {
            self.inner.stat(path)
        }

        fn atomic_write(&self, path: &std::path::Path, data: Bytes) -> Result<(), BackendError> {
            self.inner.atomic_write(path, data)
        }

        fn atomic_write_if(
            &self,
            path: &std::path::Path,
            data: Bytes,
            expected: Option<Stamp>,
        ) -> Result<(), BackendError> {
            self.inner
                .atomic_write(path, Bytes::from_static(b"from=interloper\n"))?;
            self.inner.atomic_write_if(path, data, expected)
        }

        fn ensure_dir(&self, path: &std::path::Path) -> Result<(), BackendError> {
            self.inner.ensure_dir(path)
        }

        fn ensure_file(&self, path: &std::path::Path) -> Result<(), BackendError> {
            self.inner.ensure_file(path)
        }
    }

    #[test]
    fn write_landing_during_commit_is_a_conflict() {
        let backend = MemoryBackend::new();
        let mut store = VarStore::with_backend(
            Location::new("cache", "foo", "vars"),
            Interloper {
                inner: backend.clone(),
            },
        );
        store.init().unwrap();

        let mut pending = store.begin().unwrap();
        pending.set("from", "store").unwrap();

        assert!(store.commit(pending).unwrap_err().is_conflict());
        assert_eq!(
            backend.read_all(&store.path()).unwrap(),
            Bytes::from_static(b"from=interloper\n")
        );
    }

    #[test]
    fn pending_applies_several_mutations_at_once() {
        let backend = MemoryBackend::new();
        let mut store = memory_store(&backend);
        store.set("old", "x").unwrap();

        let mut pending = store.begin().unwrap();
        pending.set("a", "1").unwrap().set("b", "2").unwrap();
        pending.remove("old");
        store.commit(pending).unwrap();

        assert_eq!(
            store.raw_contents().unwrap(),
            Bytes::from_static(b"a=1\nb=2\n")
        );
    }

    #[test]
    fn delete_removes_key() {
        let backend = MemoryBackend::new();
        let mut store = memory_store(&backend);
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();

        store.delete("a").unwrap();
        assert_eq!(store.get("a").unwrap(), "");
        assert_eq!(store.raw_contents().unwrap(), Bytes::from_static(b"b=2\n"));
    }

    #[test]
    fn delete_absent_key_does_not_write() {
        let backend = MemoryBackend::new();
        let mut store = memory_store(&backend);
        store.set("a", "1").unwrap();
        let before = backend.stat(&store.path()).unwrap();

        store.delete("missing").unwrap();
        store.delete("missing").unwrap();
        assert_eq!(backend.stat(&store.path()).unwrap(), before);
    }

    #[test]
    fn write_failure_is_reported_and_file_kept() {
        let backend = MemoryBackend::new();
        let mut store = memory_store(&backend);
        store.set("a", "1").unwrap();

        backend.fail_writes(true);
        assert!(matches!(
            store.set("a", "2"),
            Err(StoreError::WriteFailed(_))
        ));
        assert_eq!(store.get("a").unwrap(), "1");
    }

    #[test]
    fn malformed_file_fails_to_decode() {
        let backend = MemoryBackend::new();
        let mut store = memory_store(&backend);
        backend
            .atomic_write(&store.path(), Bytes::from_static(b"ok=1\ngarbage\n"))
            .unwrap();

        assert!(matches!(
            store.get("ok"),
            Err(StoreError::DecodeFailed { .. })
        ));
        assert!(matches!(
            store.set("ok", "2"),
            Err(StoreError::DecodeFailed { .. })
        ));
        // Raw access still shows what is there.
        assert_eq!(
            store.raw_contents().unwrap(),
            Bytes::from_static(b"ok=1\ngarbage\n")
        );
    }

    #[test]
    fn init_failure_is_reported() {
        let backend = MemoryBackend::new();
        let mut store =
            VarStore::with_backend(Location::new("cache", "foo", "vars"), backend.clone());
        backend.fail_writes(true);

        // Creating the empty file does not go through atomic_write, so only
        // re-initialization trips the injected failure.
        store.init().unwrap();
        assert!(matches!(
            store.reinitialize(),
            Err(StoreError::InitFailed(_))
        ));
    }
}
