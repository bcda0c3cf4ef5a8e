use super::*;
use tempfile::tempdir;

#[test]
fn write_creates_slug_dir_and_reads_back() {
    let tmp = tempdir().unwrap();
    let fs_store = FileStore::new(tmp.path().join("uploads")).unwrap();
    assert!(!fs_store.slug_dir("demo1").exists());
    fs_store.write("demo1", "a.txt", b"hello").unwrap();
    assert!(fs_store.slug_dir("demo1").is_dir());
    assert_eq!(fs_store.read("demo1", "a.txt").unwrap().as_deref(), Some(&b"hello"[..]));
    assert_eq!(fs_store.size_of("demo1", "a.txt"), Some(5));
    assert_eq!(fs_store.read("demo1", "missing.txt").unwrap(), None);
    assert_eq!(fs_store.size_of("demo1", "missing.txt"), None);
}

#[test]
fn overwrite_leaves_no_temporaries() {
    let tmp = tempdir().unwrap();
    let fs_store = FileStore::new(tmp.path()).unwrap();
    fs_store.write("s", "a.txt", b"one").unwrap();
    fs_store.write("s", "a.txt", b"two").unwrap();
    assert_eq!(fs_store.read("s", "a.txt").unwrap().unwrap(), b"two");
    let names: Vec<String> = std::fs::read_dir(fs_store.slug_dir("s"))
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["a.txt".to_string()]);
}

#[test]
fn removal_outcomes() {
    let tmp = tempdir().unwrap();
    let fs_store = FileStore::new(tmp.path()).unwrap();
    fs_store.write("s", "a.txt", b"x").unwrap();
    assert!(matches!(fs_store.remove_file("s", "a.txt"), Removal::Removed));
    assert!(matches!(fs_store.remove_file("s", "a.txt"), Removal::Missing));
    let names = vec!["gone.txt".to_string()];
    assert_eq!(fs_store.remove_files_best_effort("s", &names), 0);
}

#[test]
fn dir_removed_only_when_empty() {
    let tmp = tempdir().unwrap();
    let fs_store = FileStore::new(tmp.path()).unwrap();
    fs_store.write("s", "a.txt", b"x").unwrap();
    fs_store.write("s", "keep.txt", b"y").unwrap();
    let names = vec!["a.txt".to_string()];
    assert_eq!(fs_store.remove_files_best_effort("s", &names), 1);
    assert!(!fs_store.remove_dir_if_empty("s").unwrap());
    assert!(fs_store.slug_dir("s").exists());
    let names = vec!["keep.txt".to_string()];
    fs_store.remove_files_best_effort("s", &names);
    assert!(fs_store.remove_dir_if_empty("s").unwrap());
    assert!(!fs_store.slug_dir("s").exists());
    // Absent directory is not an error.
    assert!(!fs_store.remove_dir_if_empty("s").unwrap());
}

#[test]
fn temp_files_are_recognised_and_cleared() {
    let tmp = tempdir().unwrap();
    let fs_store = FileStore::new(tmp.path()).unwrap();
    fs_store.write("s", "a.txt", b"x").unwrap();
    std::fs::write(fs_store.slug_dir("s").join(".a.txt.0123abcd.tmp"), b"partial").unwrap();
    assert!(is_temp_name(".a.txt.0123abcd.tmp"));
    assert!(!is_temp_name("a.txt"));
    assert_eq!(fs_store.remove_temp_files("s"), 1);
    assert_eq!(fs_store.remove_temp_files("s"), 0);
    assert!(fs_store.file_path("s", "a.txt").exists());
    assert_eq!(fs_store.remove_temp_files("nope"), 0);
}

#[test]
fn lists_only_directories() {
    let tmp = tempdir().unwrap();
    let fs_store = FileStore::new(tmp.path()).unwrap();
    fs_store.write("b", "x.txt", b"1").unwrap();
    fs_store.write("a", "x.txt", b"1").unwrap();
    std::fs::write(tmp.path().join("stray.txt"), b"1").unwrap();
    assert_eq!(fs_store.list_slug_dirs().unwrap(), vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn root_lock_is_exclusive_until_dropped() {
    let tmp = tempdir().unwrap();
    let first = FileStore::new(tmp.path()).unwrap();
    let second = FileStore::new(tmp.path()).unwrap();
    let held = first.lock_root().unwrap();
    assert_eq!(held.path(), tmp.path().join(LOCK_FILE));
    assert!(matches!(second.lock_root(), Err(AppError::Io(_))));
    // The lock file is not a slug directory.
    assert!(first.list_slug_dirs().unwrap().is_empty());
    drop(held);
    let _again = second.lock_root().unwrap();
}
