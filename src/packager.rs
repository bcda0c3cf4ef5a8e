//!
//! slugdrop upload packager
//! ------------------------
//! Turns a validated upload batch into stored files under `root/<slug>/`.
//! Plain entries are stored under their base name. Entries whose client name
//! carries a folder path are gathered into one deflate zip named
//! `<slug>_folders_<count>.zip`, which keeps the relative paths as member names.
//!
//! Names are assumed to have passed `ContentValidator::validate_upload_name`.

use std::io::{Cursor, Write};

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::AppResult;
use crate::storage::FileStore;
use crate::validate::{base_name, is_hierarchical, is_separator, normalize_nfc};

/// One file as received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEntry {
    pub name: String,
    pub content: Vec<u8>,
}

impl UploadEntry {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self { name: name.into(), content: content.into() }
    }
}

/// Declared byte total of a batch, computed before anything is written.
pub fn batch_bytes(batch: &[UploadEntry]) -> u64 { batch.iter().map(|e| e.content.len() as u64).sum() }

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packaged {
    /// Stored names: plain files first, the folder archive last.
    pub files: Vec<String>,
    /// Sum of all input content, plain and archived.
    pub total_bytes: u64,
}

pub fn archive_name(slug: &str, count: usize) -> String { format!("{slug}_folders_{count}.zip") }

/// Member name inside the folder archive: NFC, `/` separators.
fn member_name(name: &str) -> String {
    let unified: String = name.chars().map(|c| if is_separator(c) { '/' } else { c }).collect();
    normalize_nfc(&unified)
}

fn build_archive(entries: &[&UploadEntry]) -> AppResult<Vec<u8>> {
    let mut zw = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for e in entries {
        zw.start_file(member_name(&e.name), opts)?;
        zw.write_all(&e.content)?;
    }
    Ok(zw.finish()?.into_inner())
}

/// Store `batch` for `slug`. On error every file this call already placed is
/// removed again before the error is returned.
pub fn package(slug: &str, batch: &[UploadEntry], store: &FileStore) -> AppResult<Packaged> {
    let mut out = Packaged::default();
    if batch.is_empty() { return Ok(out); }

    let (nested, flat): (Vec<&UploadEntry>, Vec<&UploadEntry>) = batch.iter().partition(|e| is_hierarchical(&e.name));

    let res = (|| -> AppResult<()> {
        for e in &flat {
            let name = normalize_nfc(base_name(&e.name));
            store.write(slug, &name, &e.content)?;
            out.total_bytes += e.content.len() as u64;
            if !out.files.contains(&name) { out.files.push(name); }
        }
        if !nested.is_empty() {
            let bytes = build_archive(&nested)?;
            let name = archive_name(slug, nested.len());
            store.write(slug, &name, &bytes)?;
            out.total_bytes += nested.iter().map(|e| e.content.len() as u64).sum::<u64>();
            // A plain file of the same name was just overwritten by the archive.
            out.files.retain(|f| f != &name);
            out.files.push(name);
        }
        Ok(())
    })();

    if let Err(e) = res {
        let removed = store.remove_files_best_effort(slug, &out.files);
        debug!(target: "upload", slug, removed, "packaging failed, rolled back: {e}");
        return Err(e);
    }
    Ok(out)
}
