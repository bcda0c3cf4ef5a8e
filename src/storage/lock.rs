//! Process-level ownership of a storage root.
//!
//! Whoever holds `<root>/.slugdrop.lock` is the only process allowed to change
//! that root. The per-slug lock table only serialises threads of one process, so
//! a second process working the same root (a cron sweep next to a running
//! server) would delete files under an upload that is still being written.

use std::fs::File;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

pub const LOCK_FILE: &str = ".slugdrop.lock";

/// Exclusive advisory lock on a storage root, released on drop.
#[derive(Debug)]
pub struct RootLock {
    file: File,
    path: PathBuf,
}

impl RootLock {
    /// Take the lock without waiting. Fails when another process (or another
    /// `RootLock` in this one) already holds it.
    pub fn try_acquire(root: &Path) -> AppResult<Self> {
        let path = root.join(LOCK_FILE);
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| AppError::io(format!("opening {}: {e}", path.display())))?;
        if let Err(e) = file.try_lock_exclusive() {
            debug!(target: "storage", path = %path.display(), "root lock is held: {e}");
            return Err(AppError::io(format!("{} is in use by another slugdrop process", root.display())));
        }
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path { &self.path }
}

impl Drop for RootLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(target: "storage", path = %self.path.display(), "could not release root lock: {e}");
        }
    }
}
