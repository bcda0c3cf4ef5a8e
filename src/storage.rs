//!
//! slugdrop storage module
//! -----------------------
//! On-disk home of uploaded content. Layout is `root/<slug>/<file>`: one directory
//! per slug, created lazily on the first write and removed once cleanup leaves it
//! empty. Directories are never shared between slugs.
//!
//! Writes go through `io::atomic_write`, so a reader never observes a partially
//! written file; an interrupted write leaves at most a `.<name>.<id>.tmp` sibling
//! that the sweeper reclaims later.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{AppError, AppResult};

mod io;
mod lock;

pub use io::{is_temp_name, Removal};
pub use lock::{RootLock, LOCK_FILE};

/// Per-slug file storage under a single root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`; the directory is created if missing.
    pub fn new<P: AsRef<Path>>(root: P) -> AppResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path { &self.root }

    /// Claim the whole root for this process; see `RootLock`.
    pub fn lock_root(&self) -> AppResult<RootLock> { RootLock::try_acquire(&self.root) }

    pub fn slug_dir(&self, slug: &str) -> PathBuf { self.root.join(slug) }

    pub fn file_path(&self, slug: &str, name: &str) -> PathBuf { self.slug_dir(slug).join(name) }

    /// Atomically place `content` at `root/slug/name`, creating the slug directory.
    pub fn write(&self, slug: &str, name: &str, content: &[u8]) -> AppResult<()> {
        let dir = self.slug_dir(slug);
        fs::create_dir_all(&dir)?;
        io::atomic_write(&dir.join(name), content)
            .map_err(|e| AppError::io(format!("writing {slug}/{name}: {e}")))
    }

    /// `None` when the file does not exist.
    pub fn read(&self, slug: &str, name: &str) -> AppResult<Option<Vec<u8>>> {
        match fs::read(self.file_path(slug, name)) {
            Ok(b) => Ok(Some(b)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn size_of(&self, slug: &str, name: &str) -> Option<u64> {
        fs::metadata(self.file_path(slug, name)).ok().filter(|m| m.is_file()).map(|m| m.len())
    }

    pub fn remove_file(&self, slug: &str, name: &str) -> Removal { io::remove_file_best_effort(&self.file_path(slug, name)) }

    /// Remove several files, logging and skipping failures. Returns how many were removed.
    pub fn remove_files_best_effort<'a, I>(&self, slug: &str, names: I) -> usize
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut removed = 0;
        for name in names {
            match self.remove_file(slug, name) {
                Removal::Removed => removed += 1,
                Removal::Missing => {}
                Removal::Failed(e) => warn!(target: "storage", slug, file = %name, "could not remove file: {e}"),
            }
        }
        removed
    }

    /// Remove the slug directory iff it is empty.
    pub fn remove_dir_if_empty(&self, slug: &str) -> std::io::Result<bool> { io::remove_dir_if_empty(&self.slug_dir(slug)) }

    /// Names of the directories directly under the root.
    pub fn list_slug_dirs(&self) -> std::io::Result<Vec<String>> {
        let mut out = Vec::new();
        for ent in fs::read_dir(&self.root)?.flatten() {
            if ent.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                out.push(ent.file_name().to_string_lossy().to_string());
            }
        }
        out.sort();
        Ok(out)
    }

    /// Delete leftover temporaries in a slug directory. Callers must hold the
    /// slug lock so no write for the slug is in flight.
    pub fn remove_temp_files(&self, slug: &str) -> usize {
        let Ok(rd) = fs::read_dir(self.slug_dir(slug)) else { return 0; };
        let mut removed = 0;
        for ent in rd.flatten() {
            let name = ent.file_name().to_string_lossy().to_string();
            if !is_temp_name(&name) { continue; }
            match io::remove_file_best_effort(&ent.path()) {
                Removal::Removed => removed += 1,
                Removal::Missing => {}
                Removal::Failed(e) => warn!(target: "storage", slug, file = %name, "could not remove temporary: {e}"),
            }
        }
        removed
    }
}

#[cfg(test)]
#[path = "storage/storage_tests.rs"]
mod storage_tests;
