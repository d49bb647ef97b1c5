// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-stream byte persistence on the local filesystem.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use quire_core::error::{QuireError, Result};

/// Interface the engine sees: save bytes under a name, remove by name.
///
/// Saving under an existing name overwrites. The engine always supplies
/// either a freshly generated name (new documents) or the existing document's
/// name (in-place save).
pub trait BlobStore: Send + Sync {
    fn save(&self, data: &[u8], name: &str) -> Result<PathBuf>;
    fn remove(&self, name: &str) -> Result<()>;
}

/// Blob store rooted at one directory, created on construction.
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// A store under the system temporary directory, for transient previews.
    pub fn temporary(subdir: &str) -> Result<Self> {
        Self::new(std::env::temp_dir().join(subdir))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        // Names are engine-generated (`<id>.<ext>`); anything that could
        // escape the root is rejected outright.
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
        {
            return Err(QuireError::Persistence(format!(
                "invalid blob name: {name:?}"
            )));
        }
        Ok(self.root.join(name))
    }
}

impl BlobStore for FileStorage {
    #[instrument(skip(self, data), fields(bytes = data.len(), name))]
    fn save(&self, data: &[u8], name: &str) -> Result<PathBuf> {
        let path = self.resolve(name)?;
        std::fs::write(&path, data)?;
        debug!(path = %path.display(), "blob saved");
        Ok(path)
    }

    fn remove(&self, name: &str) -> Result<()> {
        let path = self.resolve(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(name, "blob already absent");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
