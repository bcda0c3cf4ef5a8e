//! Service settings.
//!
//! Layering, lowest to highest precedence: built-in defaults, an optional JSON file,
//! `SLUGDROP_*` environment variables, then whatever the binary applies from its
//! command line. `UploadPolicy` is the subset the lifecycle manager enforces.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::security::SharedSecret;

pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "jpg", "jpeg", "png", "txt", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "md",
];

/// Upper bound on `max_expiry_days`: about a century.
pub const MAX_EXPIRY_DAYS_CAP: u32 = 36_500;

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root of the per-slug storage directories.
    pub upload_dir: PathBuf,
    /// SQLite file holding the link table.
    pub database_path: PathBuf,
    pub max_upload_bytes: u64,
    pub max_files: usize,
    pub max_expiry_days: u32,
    /// Lower-case extensions without the dot.
    pub allowed_extensions: Vec<String>,
    /// Plaintext secret, hashed once at startup. Prefer `upload_secret_hash`.
    pub upload_secret: Option<String>,
    /// argon2 PHC string.
    pub upload_secret_hash: Option<String>,
    pub sweep_interval_secs: u64,
    pub http_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            database_path: PathBuf::from("files.db"),
            max_upload_bytes: 50 * 1024 * 1024,
            max_files: 50,
            max_expiry_days: 7,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            upload_secret: None,
            upload_secret_hash: None,
            sweep_interval_secs: 24 * 60 * 60,
            http_port: 8000,
        }
    }
}

/// Limits and allow-list applied to every upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_upload_bytes: u64,
    pub max_files: usize,
    pub max_expiry_days: u32,
    pub allowed_extensions: BTreeSet<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self { Settings::default().policy() }
}

pub(crate) fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(|c| c == ',' || c == ';')
        .map(normalize_extension)
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse::<T>().map_err(|_| anyhow::anyhow!("{name}: cannot parse '{raw}'"))
}

impl Settings {
    /// Read a JSON settings file; missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("reading settings file {}", path.display()))?;
        let s: Settings = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing settings file {}", path.display()))?;
        Ok(s)
    }

    /// Defaults, then the optional file, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut s = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        s.apply_env_from(|k| std::env::var(k).ok())?;
        Ok(s)
    }

    /// Apply `SLUGDROP_*` overrides using the given lookup (the real environment in
    /// production, a map in tests).
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SLUGDROP_UPLOAD_DIR") { self.upload_dir = PathBuf::from(v); }
        if let Some(v) = lookup("SLUGDROP_DATABASE") { self.database_path = PathBuf::from(v); }
        if let Some(v) = lookup("SLUGDROP_MAX_UPLOAD_BYTES") { self.max_upload_bytes = parse_env("SLUGDROP_MAX_UPLOAD_BYTES", &v)?; }
        if let Some(v) = lookup("SLUGDROP_MAX_FILES") { self.max_files = parse_env("SLUGDROP_MAX_FILES", &v)?; }
        if let Some(v) = lookup("SLUGDROP_MAX_EXPIRY_DAYS") { self.max_expiry_days = parse_env("SLUGDROP_MAX_EXPIRY_DAYS", &v)?; }
        if let Some(v) = lookup("SLUGDROP_ALLOWED_EXTENSIONS") { self.allowed_extensions = parse_list(&v); }
        if let Some(v) = lookup("SLUGDROP_UPLOAD_SECRET") { self.upload_secret = Some(v); }
        if let Some(v) = lookup("SLUGDROP_UPLOAD_SECRET_HASH") { self.upload_secret_hash = Some(v); }
        if let Some(v) = lookup("SLUGDROP_SWEEP_INTERVAL_SECS") { self.sweep_interval_secs = parse_env("SLUGDROP_SWEEP_INTERVAL_SECS", &v)?; }
        if let Some(v) = lookup("SLUGDROP_HTTP_PORT") { self.http_port = parse_env("SLUGDROP_HTTP_PORT", &v)?; }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_upload_bytes == 0 { bail!("max_upload_bytes must be positive"); }
        if self.max_files == 0 { bail!("max_files must be positive"); }
        if self.max_expiry_days == 0 { bail!("max_expiry_days must be positive"); }
        if self.max_expiry_days > MAX_EXPIRY_DAYS_CAP {
            bail!("max_expiry_days must be at most {MAX_EXPIRY_DAYS_CAP}, got {}", self.max_expiry_days);
        }
        if self.sweep_interval_secs == 0 { bail!("sweep_interval_secs must be positive"); }
        if self.policy().allowed_extensions.is_empty() { bail!("allowed_extensions must not be empty"); }
        if self.upload_secret.as_deref().map(str::is_empty).unwrap_or(true) && self.upload_secret_hash.is_none() {
            bail!("no upload secret configured (set SLUGDROP_UPLOAD_SECRET or SLUGDROP_UPLOAD_SECRET_HASH)");
        }
        Ok(())
    }

    pub fn policy(&self) -> UploadPolicy {
        UploadPolicy {
            max_upload_bytes: self.max_upload_bytes,
            max_files: self.max_files,
            max_expiry_days: self.max_expiry_days,
            allowed_extensions: self
                .allowed_extensions
                .iter()
                .map(|e| normalize_extension(e))
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// The hash wins when both forms are configured.
    pub fn shared_secret(&self) -> Result<SharedSecret> {
        if let Some(phc) = &self.upload_secret_hash { return SharedSecret::from_phc(phc); }
        match self.upload_secret.as_deref() {
            Some(plain) if !plain.is_empty() => SharedSecret::from_plaintext(plain),
            _ => bail!("no upload secret configured"),
        }
    }

    /// One-line description for startup logs; never includes the secret.
    pub fn summary(&self) -> String {
        format!(
            "upload_dir={:?}, database={:?}, max_upload_bytes={}, max_files={}, max_expiry_days={}, extensions=[{}], sweep_interval_secs={}, http_port={}",
            self.upload_dir,
            self.database_path,
            self.max_upload_bytes,
            self.max_files,
            self.max_expiry_days,
            self.allowed_extensions.join(","),
            self.sweep_interval_secs,
            self.http_port
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_match_service_limits() {
        let s = Settings::default();
        assert_eq!(s.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(s.max_files, 50);
        assert_eq!(s.max_expiry_days, 7);
        assert_eq!(s.sweep_interval_secs, 86_400);
        assert!(s.policy().allowed_extensions.contains("pdf"));
        assert!(!s.policy().allowed_extensions.contains("exe"));
    }

    #[test]
    fn env_overrides_apply() {
        let vars = env(&[
            ("SLUGDROP_MAX_FILES", "3"),
            ("SLUGDROP_ALLOWED_EXTENSIONS", ".TXT; md ,zip"),
            ("SLUGDROP_UPLOAD_SECRET", "s3cret"),
            ("SLUGDROP_HTTP_PORT", "9090"),
        ]);
        let mut s = Settings::default();
        s.apply_env_from(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(s.max_files, 3);
        assert_eq!(s.http_port, 9090);
        let policy = s.policy();
        let exts: Vec<&str> = policy.allowed_extensions.iter().map(|e| e.as_str()).collect();
        assert_eq!(exts, vec!["md", "txt", "zip"]);
        s.validate().unwrap();
    }

    #[test]
    fn bad_numbers_are_reported() {
        let vars = env(&[("SLUGDROP_MAX_FILES", "lots")]);
        let mut s = Settings::default();
        let err = s.apply_env_from(|k| vars.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains("SLUGDROP_MAX_FILES"));
    }

    #[test]
    fn missing_secret_fails_validation() {
        let s = Settings::default();
        assert!(s.validate().is_err());
        assert!(s.shared_secret().is_err());
    }

    #[test]
    fn expiry_window_is_capped() {
        let mut s = Settings { upload_secret: Some("pw".into()), ..Settings::default() };
        s.max_expiry_days = MAX_EXPIRY_DAYS_CAP;
        s.validate().unwrap();
        s.max_expiry_days = MAX_EXPIRY_DAYS_CAP + 1;
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("max_expiry_days"), "{err}");
    }

    #[test]
    fn file_layer_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("slugdrop.json");
        std::fs::write(&p, br#"{ "max_expiry_days": 3, "upload_secret": "pw" }"#).unwrap();
        let s = Settings::from_file(&p).unwrap();
        assert_eq!(s.max_expiry_days, 3);
        assert_eq!(s.max_files, 50);
        assert!(s.shared_secret().unwrap().verify("pw"));
        assert!(!s.summary().contains("secret"));
    }
}
