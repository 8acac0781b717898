// Notification Persistence Tests - unread counters on a real FileStore

use crate::notifications::{SharedNotifications, UnreadCount};
use crate::protocol::Category;
use crate::storage::{DurableStore, FileStore, UNREAD_KEY};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_counts_persist_across_reopen() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = Arc::new(FileStore::new(temp_dir.path()).unwrap());
        let notifications = SharedNotifications::new(store);
        notifications.set_unread_count(3, 1);
        notifications.increment_unread_count(Category::Support);
    }

    let store = Arc::new(FileStore::new(temp_dir.path()).unwrap());
    let notifications = SharedNotifications::new(store);
    assert_eq!(notifications.counts(), UnreadCount::new(3, 2));
}

#[test]
fn test_corrupt_counts_file_starts_from_zero() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FileStore::new(temp_dir.path()).unwrap());
    store.set(UNREAD_KEY, "[1, 2").unwrap();

    let notifications = SharedNotifications::new(store);
    assert_eq!(notifications.counts(), UnreadCount::default());
}

#[test]
fn test_inconsistent_persisted_total_is_recomputed() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FileStore::new(temp_dir.path()).unwrap());
    store
        .set(UNREAD_KEY, r#"{"general":2,"support":2,"total":99}"#)
        .unwrap();

    let notifications = SharedNotifications::new(store);
    assert_eq!(notifications.counts().total, 4);
}

#[test]
fn test_clear_persists_zeroes() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FileStore::new(temp_dir.path()).unwrap());
    let notifications = SharedNotifications::new(store.clone());
    notifications.set_unread_count(5, 5);
    notifications.clear();

    let raw = store.get(UNREAD_KEY).unwrap().unwrap();
    let persisted: UnreadCount = serde_json::from_str(&raw).unwrap();
    assert_eq!(persisted, UnreadCount::default());
}
