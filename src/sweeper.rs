//! Expiry sweeper: periodically reclaims links whose expiry has passed.
//!
//! A pass scans every row, reclaims the expired ones through the lifecycle
//! manager (which re-checks under the slug lock), then tidies the storage root:
//! stray temporaries go, and empty directories without a row go. Nothing in a
//! pass is fatal; failures are counted and logged per entry.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::lifecycle::LinkManager;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub reclaimed: usize,
    pub files_removed: usize,
    pub dirs_removed: usize,
    pub temps_removed: usize,
    pub errors: usize,
}

#[derive(Clone)]
pub struct Sweeper {
    manager: Arc<LinkManager>,
    interval: Duration,
}

/// Stop handle for a spawned sweeper task.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the task and wait for it; an in-flight pass completes first.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(target: "sweep", "sweeper task ended abnormally: {e}");
        }
    }
}

impl Sweeper {
    pub fn new(manager: Arc<LinkManager>, interval: Duration) -> Self { Self { manager, interval } }

    /// One synchronous pass.
    pub fn run_once(&self) -> SweepReport {
        let mut rep = SweepReport::default();
        let now = self.manager.now();

        let links = match self.manager.store().scan_all() {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "sweep", "link scan failed: {e}");
                rep.errors += 1;
                Vec::new()
            }
        };
        rep.scanned = links.len();
        for link in links.iter().filter(|l| l.is_expired_at(now)) {
            match self.manager.reclaim_if_expired(&link.slug) {
                Ok(Some(r)) => {
                    rep.reclaimed += usize::from(r.row_deleted);
                    rep.files_removed += r.files_removed;
                    rep.dirs_removed += usize::from(r.dir_removed);
                    debug!(target: "sweep", slug = %link.slug, files = r.files_removed, "reclaimed");
                }
                Ok(None) => {}
                Err(e) => {
                    rep.errors += 1;
                    warn!(target: "sweep", slug = %link.slug, "reclaim failed: {e}");
                }
            }
        }

        match self.manager.files().list_slug_dirs() {
            Ok(dirs) => {
                for slug in dirs {
                    match self.manager.tidy_slug_dir(&slug) {
                        Ok(t) => {
                            rep.temps_removed += t.temps_removed;
                            rep.dirs_removed += usize::from(t.dir_removed);
                        }
                        Err(e) => {
                            rep.errors += 1;
                            warn!(target: "sweep", slug = %slug, "tidy failed: {e}");
                        }
                    }
                }
            }
            Err(e) => {
                rep.errors += 1;
                warn!(target: "sweep", "cannot list upload dir: {e}");
            }
        }
        rep
    }

    /// Run `run_once` on the blocking pool every `interval` until stopped. The
    /// first pass runs immediately.
    pub fn spawn(&self) -> SweeperHandle {
        let (tx, mut rx) = watch::channel(false);
        let me = self.clone();
        let task = tokio::spawn(async move {
            info!(target: "sweep", interval_secs = me.interval.as_secs(), "sweeper started");
            loop {
                let pass = me.clone();
                match tokio::task::spawn_blocking(move || pass.run_once()).await {
                    Ok(rep) => info!(
                        target: "sweep",
                        scanned = rep.scanned,
                        reclaimed = rep.reclaimed,
                        files = rep.files_removed,
                        dirs = rep.dirs_removed,
                        temps = rep.temps_removed,
                        errors = rep.errors,
                        "sweep pass done"
                    ),
                    Err(e) => warn!(target: "sweep", "sweep pass panicked: {e}"),
                }
                tokio::select! {
                    _ = tokio::time::sleep(me.interval) => {}
                    _ = rx.changed() => break,
                }
            }
            info!(target: "sweep", "sweeper stopped");
        });
        SweeperHandle { shutdown: tx, task }
    }
}
