//!
//! slugdrop link store
//! -------------------
//! Persistence for `Link` records keyed by slug. The lifecycle manager and the
//! sweeper only see `Arc<dyn LinkStore>`; two backends are provided:
//! - `SqliteLinkStore`: a single `links` table in an embedded SQLite file.
//! - `MemoryLinkStore`: a locked map, for tests and throwaway deployments.
//!
//! Each call is atomic on its own. Cross-call consistency (check-then-act on a
//! slug) is the caller's job.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

mod memory;
mod sqlite;

pub use memory::MemoryLinkStore;
pub use sqlite::SqliteLinkStore;

/// A slug bound to an expiry and the files stored for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub slug: String,
    pub expiry: DateTime<Utc>,
    pub files: Vec<String>,
}

impl Link {
    pub fn new(slug: impl Into<String>, expiry: DateTime<Utc>, files: Vec<String>) -> Self {
        Self { slug: slug.into(), expiry, files }
    }

    /// Logically expired once `now` is strictly past the expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool { now > self.expiry }
}

pub trait LinkStore: Send + Sync {
    fn get(&self, slug: &str) -> AppResult<Option<Link>>;
    /// Insert or fully replace the row for `link.slug`.
    fn put_replace(&self, link: &Link) -> AppResult<()>;
    /// Idempotent; true when a row existed.
    fn delete(&self, slug: &str) -> AppResult<bool>;
    /// Every readable row. Unreadable rows are skipped.
    fn scan_all(&self) -> AppResult<Vec<Link>>;
}

pub(crate) fn format_expiry(expiry: &DateTime<Utc>) -> String { expiry.to_rfc3339_opts(SecondsFormat::Millis, true) }

/// RFC 3339, or a zone-less ISO timestamp which is read as UTC.
pub(crate) fn parse_expiry(raw: &str) -> AppResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|n| n.and_utc())
        .map_err(|e| AppError::io(format!("bad expiry '{raw}': {e}")))
}

#[cfg(test)]
#[path = "link_store/link_store_tests.rs"]
mod link_store_tests;
