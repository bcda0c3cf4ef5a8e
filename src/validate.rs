//! Content validation: slugs, file names and folder-relative upload names.
//! Everything here is pure so it can run before any storage mutation.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::config::normalize_extension;
use crate::error::{AppError, AppResult};

pub const MAX_SLUG_LEN: usize = 128;

static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("slug pattern"));

/// Normalize a UTF-8 string to NFC.
pub fn normalize_nfc(input: &str) -> String { input.nfc().collect::<String>() }

pub fn is_separator(c: char) -> bool { c == '/' || c == '\\' }

/// True when the client-supplied name carries a folder path (folder upload).
pub fn is_hierarchical(name: &str) -> bool { name.chars().any(is_separator) }

/// Last path segment of a client-supplied name.
pub fn base_name(name: &str) -> &str { name.rsplit(is_separator).next().unwrap_or(name) }

pub fn validate_slug(slug: &str) -> AppResult<()> {
    if slug.len() > MAX_SLUG_LEN || !SLUG_RE.is_match(slug) {
        return Err(AppError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

fn unsafe_segment(seg: &str) -> bool {
    seg.is_empty()
        || seg == "."
        || seg == ".."
        || seg.chars().any(|c| c == '\u{0000}' || c == ':' || c.is_control())
}

/// Extension allow-list check for file names.
#[derive(Debug, Clone)]
pub struct ContentValidator {
    allowed: BTreeSet<String>,
}

impl ContentValidator {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self { allowed: allowed.into_iter().map(|e| normalize_extension(e.as_ref())).filter(|e| !e.is_empty()).collect() }
    }

    pub fn allows_extension(&self, ext: &str) -> bool { self.allowed.contains(&ext.to_ascii_lowercase()) }

    /// Validate a single file name: traversal first, then the extension.
    pub fn validate(&self, filename: &str) -> AppResult<()> {
        if filename.chars().any(is_separator) || unsafe_segment(filename) {
            return Err(AppError::UnsafePath(filename.to_string()));
        }
        let ext = match filename.rfind('.') {
            Some(i) if i > 0 && i + 1 < filename.len() => &filename[i + 1..],
            _ => return Err(AppError::DisallowedType(filename.to_string())),
        };
        if !self.allows_extension(ext) {
            return Err(AppError::DisallowedType(filename.to_string()));
        }
        Ok(())
    }

    /// Validate a name as sent by the client, which may be folder-relative
    /// (`docs/notes/a.txt`). Absolute paths, empty segments and dot segments are
    /// rejected; the last segment must pass `validate`.
    pub fn validate_upload_name(&self, name: &str) -> AppResult<()> {
        if !is_hierarchical(name) { return self.validate(name); }
        if name.starts_with(is_separator) {
            return Err(AppError::UnsafePath(name.to_string()));
        }
        if name.split(is_separator).any(unsafe_segment) {
            return Err(AppError::UnsafePath(name.to_string()));
        }
        self.validate(base_name(name))
    }
}
