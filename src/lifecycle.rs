//!
//! slugdrop lifecycle manager
//! --------------------------
//! Owns the life of a link: creation through `submit_upload`, reads through
//! `resolve`/`fetch_stored_file`, and removal through revocation, reuse of an
//! expired slug, or the sweeper. All removal paths share
//! `delete_link_and_files`, and every state change for a slug happens while
//! that slug is held in the lock table.

use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{Settings, UploadPolicy};
use crate::error::{AppError, AppResult};
use crate::link_store::{Link, LinkStore, SqliteLinkStore};
use crate::packager::{self, batch_bytes, UploadEntry};
use crate::security::SharedSecret;
use crate::storage::{FileStore, RootLock};
use crate::validate::{validate_slug, ContentValidator};

mod locks;

pub use locks::{SlugGuard, SlugLocks};

/// A stored file as reported by `resolve`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDescriptor {
    pub name: String,
    /// On-disk size; `None` when the file has gone missing.
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLink {
    pub slug: String,
    pub expiry: DateTime<Utc>,
    pub files: Vec<FileDescriptor>,
}

/// What one `delete_link_and_files` call removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReclaimReport {
    pub files_removed: usize,
    pub dir_removed: bool,
    pub row_deleted: bool,
}

/// Outcome of tidying one storage directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirTidy {
    pub temps_removed: usize,
    pub dir_removed: bool,
}

pub struct LinkManager {
    store: Arc<dyn LinkStore>,
    files: FileStore,
    policy: UploadPolicy,
    validator: ContentValidator,
    secret: SharedSecret,
    clock: Arc<dyn Clock>,
    locks: SlugLocks,
    root_lock: Option<RootLock>,
}

impl LinkManager {
    pub fn new(store: Arc<dyn LinkStore>, files: FileStore, policy: UploadPolicy, secret: SharedSecret) -> Self {
        let validator = ContentValidator::new(policy.allowed_extensions.iter());
        Self { store, files, policy, validator, secret, clock: Arc::new(SystemClock), locks: SlugLocks::new(), root_lock: None }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Hold the storage root for as long as this manager lives, so no other
    /// process can sweep or upload into it concurrently.
    pub fn with_root_lock(mut self) -> AppResult<Self> {
        if self.root_lock.is_none() {
            self.root_lock = Some(self.files.lock_root()?);
        }
        Ok(self)
    }

    /// Storage root, SQLite file and secret taken from validated settings. The
    /// returned manager owns the storage root until dropped.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        use anyhow::Context;
        settings.validate()?;
        let files = FileStore::new(&settings.upload_dir)
            .with_context(|| format!("preparing upload dir {}", settings.upload_dir.display()))?;
        let root_lock = files.lock_root()?;
        let store = SqliteLinkStore::open(&settings.database_path)
            .with_context(|| format!("opening link database {}", settings.database_path.display()))?;
        let mut mgr = Self::new(Arc::new(store), files, settings.policy(), settings.shared_secret()?);
        mgr.root_lock = Some(root_lock);
        Ok(mgr)
    }

    pub fn store(&self) -> &Arc<dyn LinkStore> { &self.store }
    pub fn files(&self) -> &FileStore { &self.files }
    pub fn policy(&self) -> &UploadPolicy { &self.policy }
    pub fn now(&self) -> DateTime<Utc> { self.clock.now() }

    fn authenticate(&self, credentials: &str) -> AppResult<()> {
        if self.secret.verify(credentials) { Ok(()) } else { Err(AppError::AuthFailure) }
    }

    /// Cheap request checks; the first violation wins and nothing is written.
    /// Returns the expiry the link will carry when created at `now`.
    fn check_request(&self, slug: &str, days: i64, batch: &[UploadEntry], now: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
        validate_slug(slug)?;
        let invalid = || AppError::InvalidExpiry { days, max: self.policy.max_expiry_days };
        if days < 1 || days > i64::from(self.policy.max_expiry_days) {
            return Err(invalid());
        }
        let expiry = Duration::try_days(days).and_then(|d| now.checked_add_signed(d)).ok_or_else(invalid)?;
        if batch.is_empty() { return Err(AppError::EmptyUpload); }
        if batch.len() > self.policy.max_files {
            return Err(AppError::TooManyFiles { count: batch.len(), max: self.policy.max_files });
        }
        for e in batch {
            self.validator.validate_upload_name(&e.name)?;
        }
        let declared = batch_bytes(batch);
        if declared > self.policy.max_upload_bytes {
            return Err(AppError::PayloadTooLarge { size: declared, max: self.policy.max_upload_bytes });
        }
        Ok(expiry.trunc_subsecs(3))
    }

    /// Undo the files of a failed attempt.
    fn roll_back(&self, slug: &str, names: &[String]) {
        self.files.remove_files_best_effort(slug, names);
        if let Err(e) = self.files.remove_dir_if_empty(slug) {
            warn!(target: "upload", slug, "could not remove directory after rollback: {e}");
        }
    }

    /// Create a link for `slug` holding `batch`, valid for `days` days.
    pub fn submit_upload(&self, slug: &str, days: i64, batch: Vec<UploadEntry>, credentials: &str) -> AppResult<Link> {
        self.authenticate(credentials)?;
        let now = self.clock.now();
        let expiry = self.check_request(slug, days, &batch, now)?;

        let _held = self.locks.lock(slug);
        if let Some(existing) = self.store.get(slug)? {
            if !existing.is_expired_at(now) {
                return Err(AppError::SlugInUse(slug.to_string()));
            }
            let r = self.delete_link_and_files(&existing)?;
            debug!(target: "upload", slug, files_removed = r.files_removed, "reclaimed expired link before reuse");
        }

        let packaged = packager::package(slug, &batch, &self.files)?;
        // The ceiling was enforced on this same total in `check_request`.
        debug_assert_eq!(packaged.total_bytes, batch_bytes(&batch));
        let link = Link::new(slug, expiry, packaged.files);
        if let Err(e) = self.store.put_replace(&link) {
            self.roll_back(slug, &link.files);
            return Err(e);
        }
        info!(target: "upload", slug, files = link.files.len(), bytes = packaged.total_bytes, expiry = %link.expiry, "link created");
        Ok(link)
    }

    fn live_link(&self, slug: &str) -> AppResult<Link> {
        if validate_slug(slug).is_err() { return Err(AppError::NotFound(slug.to_string())); }
        let link = self.store.get(slug)?.ok_or_else(|| AppError::NotFound(slug.to_string()))?;
        if link.is_expired_at(self.clock.now()) {
            return Err(AppError::Expired(slug.to_string()));
        }
        Ok(link)
    }

    /// Look up a live link and describe its files.
    pub fn resolve(&self, slug: &str) -> AppResult<ResolvedLink> {
        let link = self.live_link(slug)?;
        let files = link
            .files
            .iter()
            .map(|name| FileDescriptor { name: name.clone(), size: self.files.size_of(slug, name) })
            .collect();
        Ok(ResolvedLink { slug: link.slug, expiry: link.expiry, files })
    }

    /// Bytes of one file of a live link. Names not listed in the link are not served.
    pub fn fetch_stored_file(&self, slug: &str, filename: &str) -> AppResult<Vec<u8>> {
        let link = self.live_link(slug)?;
        if !link.files.iter().any(|f| f == filename) {
            return Err(AppError::NotFound(format!("{slug}/{filename}")));
        }
        self.files.read(slug, filename)?.ok_or_else(|| AppError::NotFound(format!("{slug}/{filename}")))
    }

    /// Remove a link, live or expired, together with its files.
    pub fn revoke(&self, slug: &str, credentials: &str) -> AppResult<ReclaimReport> {
        self.authenticate(credentials)?;
        if validate_slug(slug).is_err() { return Err(AppError::NotFound(slug.to_string())); }
        let _held = self.locks.lock(slug);
        let link = self.store.get(slug)?.ok_or_else(|| AppError::NotFound(slug.to_string()))?;
        let report = self.delete_link_and_files(&link)?;
        info!(target: "upload", slug, files_removed = report.files_removed, "link revoked");
        Ok(report)
    }

    /// Delete the link's files (best effort), then its directory if empty, then
    /// the row. The caller must hold the slug. A failed row delete is returned;
    /// the files are already gone by then and a later pass retries the row.
    pub(crate) fn delete_link_and_files(&self, link: &Link) -> AppResult<ReclaimReport> {
        let slug = link.slug.as_str();
        let mut report = ReclaimReport { files_removed: self.files.remove_files_best_effort(slug, &link.files), ..Default::default() };
        match self.files.remove_dir_if_empty(slug) {
            Ok(removed) => report.dir_removed = removed,
            Err(e) => warn!(target: "sweep", slug, "could not remove directory: {e}"),
        }
        report.row_deleted = self.store.delete(slug)?;
        Ok(report)
    }

    /// Re-check `slug` under its lock and reclaim it if it is still expired.
    /// `None` when the link is gone or was renewed in the meantime.
    pub fn reclaim_if_expired(&self, slug: &str) -> AppResult<Option<ReclaimReport>> {
        let _held = self.locks.lock(slug);
        match self.store.get(slug)? {
            Some(link) if link.is_expired_at(self.clock.now()) => Ok(Some(self.delete_link_and_files(&link)?)),
            _ => Ok(None),
        }
    }

    /// Clear temporaries left in a slug directory and drop the directory when it is
    /// empty and no link row refers to it. Directories that are not slug-shaped are
    /// left alone.
    pub fn tidy_slug_dir(&self, slug: &str) -> AppResult<DirTidy> {
        if validate_slug(slug).is_err() { return Ok(DirTidy::default()); }
        let _held = self.locks.lock(slug);
        let mut out = DirTidy { temps_removed: self.files.remove_temp_files(slug), ..Default::default() };
        if self.store.get(slug)?.is_none() {
            out.dir_removed = self.files.remove_dir_if_empty(slug)?;
        }
        Ok(out)
    }
}
