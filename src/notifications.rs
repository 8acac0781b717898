//! Unread notification counters
//!
//! Counts are kept per [`Category`] with a derived total, persisted on every
//! mutation and restored at construction. They outlive the session unless
//! the client is configured to reset them on logout.

use crate::protocol::Category;
use crate::storage::{DurableStore, UNREAD_KEY};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Unread counters; `total` is always `general + support`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCount {
    /// Unread general messages
    pub general: u32,
    /// Unread support messages
    pub support: u32,
    /// Sum of both categories
    pub total: u32,
}

impl UnreadCount {
    /// Build counters with a consistent total
    ///
    /// `support` is clamped so that `general + support` fits in a `u32`.
    pub fn new(general: u32, support: u32) -> Self {
        let support = support.min(u32::MAX - general);
        Self {
            general,
            support,
            total: general + support,
        }
    }

    /// Count for one category
    pub fn get(&self, category: Category) -> u32 {
        match category {
            Category::General => self.general,
            Category::Support => self.support,
        }
    }
}

/// Persisted unread-counter store
#[derive(Debug)]
pub struct NotificationStore {
    counts: UnreadCount,
    storage: Arc<dyn DurableStore>,
}

impl NotificationStore {
    /// Restore counters from `storage`, falling back to zero on absent or corrupt data
    pub fn new(storage: Arc<dyn DurableStore>) -> Self {
        let counts = match storage.get(UNREAD_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<UnreadCount>(&raw) {
                // Never trust a persisted total.
                Ok(stored) => UnreadCount::new(stored.general, stored.support),
                Err(e) => {
                    warn!("Ignoring corrupt unread counters: {}", e);
                    UnreadCount::default()
                }
            },
            Ok(None) => UnreadCount::default(),
            Err(e) => {
                warn!("Failed to read unread counters: {}", e);
                UnreadCount::default()
            }
        };
        Self { counts, storage }
    }

    /// Current counters
    pub fn counts(&self) -> UnreadCount {
        self.counts
    }

    /// Overwrite both counters
    pub fn set_unread_count(&mut self, general: u32, support: u32) {
        self.apply(UnreadCount::new(general, support));
    }

    /// Add one unread message to `category`
    pub fn increment_unread_count(&mut self, category: Category) {
        let UnreadCount { general, support, total } = self.counts;
        if total == u32::MAX {
            warn!("Unread counters saturated, ignoring increment");
            return;
        }
        let next = match category {
            Category::General => UnreadCount::new(general.saturating_add(1), support),
            Category::Support => UnreadCount::new(general, support.saturating_add(1)),
        };
        self.apply(next);
    }

    /// Remove one unread message from `category`; stays at zero
    pub fn decrement_unread_count(&mut self, category: Category) {
        let UnreadCount { general, support, .. } = self.counts;
        let next = match category {
            Category::General => UnreadCount::new(general.saturating_sub(1), support),
            Category::Support => UnreadCount::new(general, support.saturating_sub(1)),
        };
        self.apply(next);
    }

    /// Zero both counters
    pub fn clear(&mut self) {
        self.apply(UnreadCount::default());
    }

    fn apply(&mut self, next: UnreadCount) {
        self.counts = next;
        debug!(
            "Unread counts: general={} support={} total={}",
            next.general, next.support, next.total
        );
        match serde_json::to_string(&next) {
            Ok(json) => {
                if let Err(e) = self.storage.set(UNREAD_KEY, &json) {
                    warn!("Failed to persist unread counters: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize unread counters: {}", e),
        }
    }
}

/// Cloneable handle to a [`NotificationStore`] shared between tasks
#[derive(Debug, Clone)]
pub struct SharedNotifications {
    inner: Arc<Mutex<NotificationStore>>,
}

impl SharedNotifications {
    /// Restore counters from `storage`
    pub fn new(storage: Arc<dyn DurableStore>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(NotificationStore::new(storage))),
        }
    }

    fn store(&self) -> MutexGuard<'_, NotificationStore> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current counters
    pub fn counts(&self) -> UnreadCount {
        self.store().counts()
    }

    /// Overwrite both counters
    pub fn set_unread_count(&self, general: u32, support: u32) {
        self.store().set_unread_count(general, support);
    }

    /// Add one unread message to `category`
    pub fn increment_unread_count(&self, category: Category) {
        self.store().increment_unread_count(category);
    }

    /// Remove one unread message from `category`
    pub fn decrement_unread_count(&self, category: Category) {
        self.store().decrement_unread_count(category);
    }

    /// Zero both counters
    pub fn clear(&self) {
        self.store().clear();
    }
}
