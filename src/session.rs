//! Session state
//!
//! The session is the client-held record of the current identity and its
//! bearer token. [`SessionStore`] owns the state and its transitions and
//! mirrors the token and user snapshot into durable storage.
//! [`SessionManager`] is the shared, cloneable handle handed to the rest of
//! the client.

use crate::storage::{DurableStore, TOKEN_KEY, USER_KEY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Error text recorded when a persisted session fails validation
pub const SESSION_EXPIRED: &str = "Session expired";

/// Authenticated user as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    /// User identifier
    pub id: String,
    /// Login email
    pub email: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Marketplace role (e.g. "client", "talent", "admin")
    #[serde(default)]
    pub role: String,
    /// Any other fields the server sends, kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserRecord {
    /// Create a user record with no extra fields
    pub fn new(id: &str, email: &str, role: &str) -> Self {
        Self {
            id: id.to_string(),
            email: email.to_string(),
            name: None,
            role: role.to_string(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Snapshot of the session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Current user, `None` when logged out
    pub user: Option<UserRecord>,
    /// Bearer token
    pub token: Option<String>,
    /// Always equal to `user.is_some()`
    pub is_authenticated: bool,
    /// True until the bootstrap run has finished
    pub is_initializing: bool,
    /// True while an interactive login is in flight
    pub is_loading: bool,
    /// Last login or validation error
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            token: None,
            is_authenticated: false,
            is_initializing: true,
            is_loading: false,
            error: None,
        }
    }
}

/// Owner of the session state and its transitions
///
/// Every transition is synchronous and total: storage failures are logged
/// and never surface to the caller.
#[derive(Debug)]
pub struct SessionStore {
    state: SessionState,
    storage: Arc<dyn DurableStore>,
    /// Bumped whenever the identity changes underneath an in-flight validation
    epoch: u64,
}

impl SessionStore {
    /// Create an uninitialized store backed by `storage`
    pub fn new(storage: Arc<dyn DurableStore>) -> Self {
        Self {
            state: SessionState::default(),
            storage,
            epoch: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Identity epoch, used to discard stale validation results
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Interactive login started
    pub fn login_start(&mut self) {
        self.state.is_loading = true;
        self.state.error = None;
    }

    /// Interactive login succeeded
    pub fn login_success(&mut self, user: UserRecord, token: String) {
        info!("Logged in as {}", user.id);
        self.persist(TOKEN_KEY, &token);
        self.persist_user(&user);
        self.state.user = Some(user);
        self.state.token = Some(token);
        self.state.is_authenticated = true;
        self.state.is_loading = false;
        self.state.is_initializing = false;
        self.state.error = None;
        self.epoch += 1;
    }

    /// Interactive login failed
    pub fn login_failure(&mut self, error: impl Into<String>) {
        let error = error.into();
        warn!("Login failed: {}", error);
        self.state.user = None;
        self.state.token = None;
        self.state.is_authenticated = false;
        self.state.is_loading = false;
        self.state.error = Some(error);
    }

    /// Explicit logout: clear state and persisted credentials
    pub fn logout(&mut self) {
        info!("Logging out");
        self.clear_persisted();
        self.state.user = None;
        self.state.token = None;
        self.state.is_authenticated = false;
        self.state.is_loading = false;
        self.state.is_initializing = false;
        self.state.error = None;
        self.epoch += 1;
    }

    /// Replace the user, deriving `is_authenticated`
    ///
    /// A `Some` user refreshes the persisted snapshot.
    pub fn set_user(&mut self, user: Option<UserRecord>) {
        if let Some(user) = &user {
            self.persist_user(user);
        }
        self.state.is_authenticated = user.is_some();
        self.state.user = user;
    }

    /// Leave the loading and initializing phases
    pub fn stop_loading(&mut self) {
        self.state.is_loading = false;
        self.state.is_initializing = false;
    }

    /// Leave the initializing phase; an interactive login in flight keeps loading
    pub fn finish_initializing(&mut self) {
        self.state.is_initializing = false;
    }

    /// Adopt a persisted token, and optionally a persisted user snapshot
    pub fn restore(&mut self, token: String, user: Option<UserRecord>) {
        debug!("Restoring persisted session");
        self.state.token = Some(token);
        self.state.is_authenticated = user.is_some();
        self.state.user = user;
    }

    /// Drop a session the server no longer accepts
    pub fn expire(&mut self) {
        info!("Persisted session rejected, clearing");
        self.clear_persisted();
        self.state.user = None;
        self.state.token = None;
        self.state.is_authenticated = false;
        self.state.error = Some(SESSION_EXPIRED.to_string());
    }

    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.storage.set(key, value) {
            warn!("Failed to persist {}: {}", key, e);
        }
    }

    fn persist_user(&self, user: &UserRecord) {
        match serde_json::to_string(user) {
            Ok(json) => self.persist(USER_KEY, &json),
            Err(e) => warn!("Failed to serialize user snapshot: {}", e),
        }
    }

    fn clear_persisted(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!("Failed to remove {}: {}", key, e);
            }
        }
    }
}

/// Shared handle to the session store
///
/// # Example
/// ```rust
/// use staffwire::session::{SessionManager, UserRecord};
/// use staffwire::storage::MemoryStore;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let session = SessionManager::new(Arc::new(MemoryStore::new()));
/// session
///     .update(|s| s.login_success(UserRecord::new("u1", "a@b.c", "client"), "tok".into()))
///     .await;
/// assert!(session.snapshot().await.is_authenticated);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct SessionManager {
    inner: Arc<RwLock<SessionStore>>,
    storage: Arc<dyn DurableStore>,
}

impl SessionManager {
    /// Create a manager around a fresh store
    pub fn new(storage: Arc<dyn DurableStore>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionStore::new(storage.clone()))),
            storage,
        }
    }

    /// Storage backing this session
    pub fn storage(&self) -> &Arc<dyn DurableStore> {
        &self.storage
    }

    /// Clone of the current state
    pub async fn snapshot(&self) -> SessionState {
        self.inner.read().await.state().clone()
    }

    /// Current bearer token
    pub async fn token(&self) -> Option<String> {
        self.inner.read().await.state().token.clone()
    }

    /// Current identity epoch
    pub async fn epoch(&self) -> u64 {
        self.inner.read().await.epoch()
    }

    /// Apply one or more transitions under a single write lock
    pub async fn update<F, T>(&self, update_fn: F) -> T
    where
        F: FnOnce(&mut SessionStore) -> T,
    {
        let mut store = self.inner.write().await;
        update_fn(&mut store)
    }
}
