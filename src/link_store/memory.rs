use std::collections::HashMap;

use parking_lot::RwLock;

use super::{Link, LinkStore};
use crate::error::AppResult;

/// Link rows held in process memory; lost on restart.
#[derive(Debug, Default)]
pub struct MemoryLinkStore {
    rows: RwLock<HashMap<String, Link>>,
}

impl MemoryLinkStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.rows.read().len() }

    pub fn is_empty(&self) -> bool { self.rows.read().is_empty() }
}

impl LinkStore for MemoryLinkStore {
    fn get(&self, slug: &str) -> AppResult<Option<Link>> { Ok(self.rows.read().get(slug).cloned()) }

    fn put_replace(&self, link: &Link) -> AppResult<()> {
        self.rows.write().insert(link.slug.clone(), link.clone());
        Ok(())
    }

    fn delete(&self, slug: &str) -> AppResult<bool> { Ok(self.rows.write().remove(slug).is_some()) }

    fn scan_all(&self) -> AppResult<Vec<Link>> {
        let mut out: Vec<Link> = self.rows.read().values().cloned().collect();
        out.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(out)
    }
}
