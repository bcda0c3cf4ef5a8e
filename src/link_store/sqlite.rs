//! SQLite-backed link table.
//!
//! Schema: `links(slug TEXT PRIMARY KEY, expiry TEXT NOT NULL, files TEXT NOT NULL)`
//! with `expiry` as RFC 3339 UTC and `files` as a JSON array of names.

use std::path::Path;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use tracing::warn;

use super::{format_expiry, parse_expiry, Link, LinkStore};
use crate::error::{AppError, AppResult};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS links (
    slug   TEXT PRIMARY KEY,
    expiry TEXT NOT NULL,
    files  TEXT NOT NULL
);";

pub struct SqliteLinkStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteLinkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_struct("SqliteLinkStore").finish_non_exhaustive() }
}

fn decode_row(slug: String, expiry: &str, files: &str) -> AppResult<Link> {
    let expiry = parse_expiry(expiry)?;
    let files: Vec<String> = serde_json::from_str(files)
        .map_err(|e| AppError::io(format!("bad file list for '{slug}': {e}")))?;
    Ok(Link { slug, expiry, files })
}

impl SqliteLinkStore {
    /// Open (or create) the database file and ensure the table exists.
    pub fn open<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() { std::fs::create_dir_all(parent)?; }
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> AppResult<Self> { Self::init(Connection::open_in_memory()?) }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Raw row write, used by tests to plant malformed records.
    #[cfg(test)]
    pub(crate) fn put_raw(&self, slug: &str, expiry: &str, files: &str) -> AppResult<()> {
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO links (slug, expiry, files) VALUES (?1, ?2, ?3)",
            rusqlite::params![slug, expiry, files],
        )?;
        Ok(())
    }
}

impl LinkStore for SqliteLinkStore {
    fn get(&self, slug: &str) -> AppResult<Option<Link>> {
        let conn = self.conn.lock();
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT expiry, files FROM links WHERE slug = ?1",
                rusqlite::params![slug],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        match row {
            Some((expiry, files)) => Ok(Some(decode_row(slug.to_string(), &expiry, &files)?)),
            None => Ok(None),
        }
    }

    fn put_replace(&self, link: &Link) -> AppResult<()> {
        let files = serde_json::to_string(&link.files)?;
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO links (slug, expiry, files) VALUES (?1, ?2, ?3)",
            rusqlite::params![link.slug, format_expiry(&link.expiry), files],
        )?;
        Ok(())
    }

    fn delete(&self, slug: &str) -> AppResult<bool> {
        let n = self.conn.lock().execute("DELETE FROM links WHERE slug = ?1", rusqlite::params![slug])?;
        Ok(n > 0)
    }

    fn scan_all(&self) -> AppResult<Vec<Link>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT slug, expiry, files FROM links ORDER BY slug")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?, r.get::<_, String>(2)?)))?;
        let mut out = Vec::new();
        for row in rows {
            let (slug, expiry, files) = match row {
                Ok(t) => t,
                Err(e) => {
                    warn!(target: "sweep", "skipping unreadable link row: {e}");
                    continue;
                }
            };
            match decode_row(slug, &expiry, &files) {
                Ok(link) => out.push(link),
                Err(e) => warn!(target: "sweep", "skipping corrupt link row: {e}"),
            }
        }
        Ok(out)
    }
}
