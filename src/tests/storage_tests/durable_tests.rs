// Durable Store Tests - Testing FileStore and MemoryStore

use crate::storage::{DurableStore, FileStore, MemoryStore};
use crate::Error;
use tempfile::TempDir;

// FileStore Tests

#[test]
fn test_file_store_creates_directory() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path().join("nested").join("store");

    let store = FileStore::new(&root).expect("Failed to open store");

    assert!(root.is_dir());
    assert_eq!(store.root(), root.as_path());
}

#[test]
fn test_file_store_set_get_remove() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = FileStore::new(temp_dir.path()).unwrap();

    assert!(store.get("token").unwrap().is_none());

    store.set("token", "abc").expect("Failed to write");
    assert_eq!(store.get("token").unwrap().as_deref(), Some("abc"));

    // Overwrite
    store.set("token", "def").unwrap();
    assert_eq!(store.get("token").unwrap().as_deref(), Some("def"));

    store.remove("token").expect("Failed to remove");
    assert!(store.get("token").unwrap().is_none());
}

#[test]
fn test_file_store_remove_missing_key() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::new(temp_dir.path()).unwrap();
    assert!(store.remove("never_written").is_ok());
}

#[test]
fn test_file_store_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = FileStore::new(temp_dir.path()).unwrap();
        store.set("unread_counts", r#"{"general":1,"support":2,"total":3}"#).unwrap();
    }

    let reopened = FileStore::new(temp_dir.path()).unwrap();
    assert_eq!(
        reopened.get("unread_counts").unwrap().as_deref(),
        Some(r#"{"general":1,"support":2,"total":3}"#)
    );
}

#[test]
fn test_file_store_leaves_no_temp_files() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::new(temp_dir.path()).unwrap();
    store.set("user", "{}").unwrap();

    let names: Vec<String> = std::fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["user.json".to_string()]);
}

#[test]
fn test_file_store_rejects_path_like_keys() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::new(temp_dir.path()).unwrap();

    for key in ["", "../escape", "a/b", "dot.key"] {
        assert!(
            matches!(store.set(key, "x"), Err(Error::Storage(_))),
            "key {:?} should be rejected",
            key
        );
    }
}

// MemoryStore Tests

#[test]
fn test_memory_store_set_get_remove() {
    let store = MemoryStore::new();
    assert!(store.get("user").unwrap().is_none());

    store.set("user", "{\"id\":\"u1\"}").unwrap();
    assert_eq!(store.get("user").unwrap().as_deref(), Some("{\"id\":\"u1\"}"));

    store.remove("user").unwrap();
    store.remove("user").unwrap();
    assert!(store.get("user").unwrap().is_none());
}
