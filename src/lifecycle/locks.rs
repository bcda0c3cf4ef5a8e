//! Per-slug mutual exclusion.
//!
//! A slug is "held" while its name is in the set. Entries exist only while held,
//! so the table stays as small as the number of in-flight operations.

use std::collections::HashSet;

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
pub struct SlugLocks {
    held: Mutex<HashSet<String>>,
    released: Condvar,
}

/// Releases the slug on drop.
#[must_use = "the slug is released as soon as the guard is dropped"]
pub struct SlugGuard<'a> {
    owner: &'a SlugLocks,
    slug: String,
}

impl SlugLocks {
    pub fn new() -> Self { Self::default() }

    /// Block until `slug` is free, then hold it.
    pub fn lock(&self, slug: &str) -> SlugGuard<'_> {
        let mut held = self.held.lock();
        while held.contains(slug) {
            self.released.wait(&mut held);
        }
        held.insert(slug.to_string());
        SlugGuard { owner: self, slug: slug.to_string() }
    }

    #[cfg(test)]
    fn try_lock(&self, slug: &str) -> Option<SlugGuard<'_>> {
        let mut held = self.held.lock();
        if !held.insert(slug.to_string()) { return None; }
        Some(SlugGuard { owner: self, slug: slug.to_string() })
    }

    #[cfg(test)]
    fn in_flight(&self) -> usize { self.held.lock().len() }
}

impl Drop for SlugGuard<'_> {
    fn drop(&mut self) {
        self.owner.held.lock().remove(&self.slug);
        self.owner.released.notify_all();
    }
}
