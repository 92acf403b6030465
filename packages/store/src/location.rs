//! Where a variables file lives.

use std::path::{Path, PathBuf};

use crate::StoreError;

/// File name used when none is given.
pub const DEFAULT_FILE_NAME: &str = "vars";

/// The on-disk location of one namespace's variables file:
/// `base_dir/namespace/file_name`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    base_dir: PathBuf,
    namespace: String,
    file_name: String,
}

impl Location {
    pub fn new(
        base_dir: impl Into<PathBuf>,
        namespace: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            namespace: namespace.into(),
            file_name: file_name.into(),
        }
    }

    /// `<user cache dir>/<namespace>/vars`.
    pub fn user_cache(namespace: impl Into<String>) -> Result<Self, StoreError> {
        let base_dir = dirs::cache_dir().ok_or(StoreError::NoCacheDir)?;
        Ok(Self::new(base_dir, namespace, DEFAULT_FILE_NAME))
    }

    /// Like [`Location::user_cache`], namespaced by the running program's
    /// name.
    pub fn for_current_exe() -> Result<Self, StoreError> {
        Self::user_cache(exe_name())
    }

    /// Replace the file name.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// `base_dir/namespace`
    pub fn dir_path(&self) -> PathBuf {
        self.base_dir.join(&self.namespace)
    }

    /// `base_dir/namespace/file_name`
    pub fn path(&self) -> PathBuf {
        self.dir_path().join(&self.file_name)
    }
}

/// File stem of the current executable, falling back to the crate name.
fn exe_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|exe| {
            exe.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}
