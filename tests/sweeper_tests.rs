//! Sweeper passes against a real storage root and SQLite table.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tempfile::tempdir;

use slugdrop::clock::{Clock, ManualClock};
use slugdrop::config::UploadPolicy;
use slugdrop::link_store::{Link, LinkStore, SqliteLinkStore};
use slugdrop::packager::UploadEntry;
use slugdrop::security::SharedSecret;
use slugdrop::storage::FileStore;
use slugdrop::sweeper::Sweeper;
use slugdrop::LinkManager;

fn setup(root: &std::path::Path) -> Result<(Arc<LinkManager>, Arc<ManualClock>)> {
    let store = Arc::new(SqliteLinkStore::open(root.join("files.db"))?);
    let clock = Arc::new(ManualClock::starting_now());
    let mgr = LinkManager::new(store, FileStore::new(root.join("uploads"))?, UploadPolicy::default(), SharedSecret::from_plaintext("pw")?)
        .with_clock(clock.clone());
    Ok((Arc::new(mgr), clock))
}

#[test]
fn expired_links_are_fully_reclaimed() -> Result<()> {
    let dir = tempdir()?;
    let (mgr, clock) = setup(dir.path())?;
    mgr.submit_upload("gone", 1, vec![UploadEntry::new("a.txt", "a"), UploadEntry::new("b.pdf", "b")], "pw")?;
    mgr.submit_upload("kept", 7, vec![UploadEntry::new("c.txt", "c")], "pw")?;
    clock.advance(chrono::Duration::days(2));

    let sweeper = Sweeper::new(mgr.clone(), Duration::from_secs(86_400));
    let rep = sweeper.run_once();
    assert_eq!(rep.scanned, 2);
    assert_eq!(rep.reclaimed, 1);
    assert_eq!(rep.files_removed, 2);
    assert_eq!(rep.errors, 0);
    assert!(mgr.store().get("gone")?.is_none());
    assert!(!mgr.files().slug_dir("gone").exists());
    assert!(mgr.resolve("kept").is_ok());

    // A second pass has nothing to do.
    let again = sweeper.run_once();
    assert_eq!((again.reclaimed, again.files_removed, again.dirs_removed), (0, 0, 0));
    Ok(())
}

#[test]
fn directory_with_unrelated_file_is_kept() -> Result<()> {
    let dir = tempdir()?;
    let (mgr, clock) = setup(dir.path())?;
    mgr.submit_upload("shared", 1, vec![UploadEntry::new("a.txt", "a")], "pw")?;
    std::fs::write(mgr.files().slug_dir("shared").join("notes.txt"), b"not ours")?;
    clock.advance(chrono::Duration::days(2));

    let rep = Sweeper::new(mgr.clone(), Duration::from_secs(60)).run_once();
    assert_eq!(rep.reclaimed, 1);
    assert_eq!(rep.dirs_removed, 0);
    assert!(mgr.store().get("shared")?.is_none());
    assert!(!mgr.files().file_path("shared", "a.txt").exists());
    assert!(mgr.files().file_path("shared", "notes.txt").exists());
    Ok(())
}

#[test]
fn missing_files_and_stray_temporaries_do_not_stop_a_pass() -> Result<()> {
    let dir = tempdir()?;
    let (mgr, clock) = setup(dir.path())?;
    // Row whose files never made it to disk.
    mgr.store().put_replace(&Link::new("ghost", clock.now(), vec!["x.txt".into()]))?;
    mgr.submit_upload("real", 1, vec![UploadEntry::new("a.txt", "a")], "pw")?;
    std::fs::create_dir_all(mgr.files().slug_dir("crashed"))?;
    std::fs::write(mgr.files().slug_dir("crashed").join(".a.txt.1f2e.tmp"), b"half")?;
    clock.advance(chrono::Duration::days(2));

    let rep = Sweeper::new(mgr.clone(), Duration::from_secs(60)).run_once();
    assert_eq!(rep.errors, 0);
    assert_eq!(rep.reclaimed, 2);
    assert_eq!(rep.temps_removed, 1);
    assert!(!mgr.files().slug_dir("crashed").exists());
    assert!(mgr.store().scan_all()?.is_empty());
    Ok(())
}
