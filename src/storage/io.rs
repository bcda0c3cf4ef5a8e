//! Low-level file helpers: atomic placement and best-effort removal.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;

pub(crate) const TMP_PREFIX: &str = ".";
pub(crate) const TMP_SUFFIX: &str = ".tmp";

/// True for temporaries created by `atomic_write`.
pub fn is_temp_name(name: &str) -> bool { name.starts_with(TMP_PREFIX) && name.ends_with(TMP_SUFFIX) }

fn temp_sibling(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new(""));
    let file_name = path.file_name().unwrap_or_default().to_string_lossy();
    parent.join(format!("{}{}.{}{}", TMP_PREFIX, file_name, Uuid::new_v4().simple(), TMP_SUFFIX))
}

/// Write `content` to a unique temporary sibling, flush it to disk and rename it
/// over `path`. Readers see either the previous file or the complete new one.
pub fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let tmp = temp_sibling(path);
    let res = (|| {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(content)?;
        f.sync_all()?;
        drop(f);
        fs::rename(&tmp, path)
    })();
    if res.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    res
}

#[derive(Debug)]
pub enum Removal {
    Removed,
    Missing,
    Failed(std::io::Error),
}

pub fn remove_file_best_effort(path: &Path) -> Removal {
    match fs::remove_file(path) {
        Ok(()) => Removal::Removed,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Removal::Missing,
        Err(e) => Removal::Failed(e),
    }
}

/// Remove `dir` only if it exists and has no entries. Returns true when removed.
pub fn remove_dir_if_empty(dir: &Path) -> std::io::Result<bool> {
    let mut rd = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if rd.next().is_some() { return Ok(false); }
    match fs::remove_dir(dir) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => {
            // Something was written between the listing and the removal.
            let refilled = fs::read_dir(dir).map(|mut r| r.next().is_some()).unwrap_or(false);
            if refilled { Ok(false) } else { Err(e) }
        }
    }
}
