//! Client context
//!
//! [`StaffwireClient`] wires the session, bootstrapper, unread counters and
//! connection manager together. It is constructed explicitly and passed to
//! whoever needs it; there is no global state, so every test can build a
//! fresh client.

use crate::bootstrap::{
    BootstrapOutcome, HttpSessionValidator, SessionBootstrapper, SessionValidator,
};
use crate::connection::{ConnectionManager, ConnectionOptions};
use crate::guard::{GuestGuard, ProtectedGuard};
use crate::notifications::SharedNotifications;
use crate::session::{SessionManager, SessionState, UserRecord};
use crate::storage::{ClientSettings, DurableStore, FileStore};
use crate::transport::{Connector, WsConnector};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Realtime client context
pub struct StaffwireClient {
    settings: ClientSettings,
    session: SessionManager,
    notifications: SharedNotifications,
    connection: ConnectionManager,
    validator: Arc<dyn SessionValidator>,
}

impl StaffwireClient {
    /// Build a client from explicit collaborators
    pub fn new(
        settings: ClientSettings,
        storage: Arc<dyn DurableStore>,
        validator: Arc<dyn SessionValidator>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let session = SessionManager::new(storage.clone());
        let notifications = SharedNotifications::new(storage);
        let connection = ConnectionManager::new(
            connector,
            notifications.clone(),
            ConnectionOptions::from(&settings),
        );
        Self {
            settings,
            session,
            notifications,
            connection,
            validator,
        }
    }

    /// Build a production client: file storage, HTTP validation, WebSocket transport
    pub fn from_settings(settings: ClientSettings) -> Result<Self> {
        settings.validate()?;
        let storage = Arc::new(FileStore::new(&settings.storage_path)?);
        let validator = Arc::new(HttpSessionValidator::new(
            &settings.api_base_url,
            settings.connect_timeout(),
        )?);
        let connector = Arc::new(WsConnector::new(settings.connect_timeout()));
        Ok(Self::new(settings, storage, validator, connector))
    }

    /// Settings in effect
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Session handle
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Unread counters
    pub fn notifications(&self) -> &SharedNotifications {
        &self.notifications
    }

    /// Connection manager
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Guard for views that need a logged-in user
    pub fn protected_guard(&self) -> ProtectedGuard {
        ProtectedGuard::new(&self.settings.login_route)
    }

    /// Guard for guest-only views
    pub fn guest_guard(&self) -> GuestGuard {
        GuestGuard::new(&self.settings.dashboard_route)
    }

    /// Bootstrap the session and, if it survives, connect
    ///
    /// A failed connection is logged; the caller can retry with [`Self::connect`].
    pub async fn init(&self) -> BootstrapOutcome {
        let bootstrapper = SessionBootstrapper::new(self.session.clone(), self.validator.clone());
        let outcome = bootstrapper.run().await;
        if matches!(outcome, BootstrapOutcome::Validated(_)) {
            if let Err(e) = self.connect().await {
                warn!("Realtime connection unavailable after bootstrap: {}", e);
            }
        }
        outcome
    }

    /// Connect with the current session token
    ///
    /// # Errors
    /// [`Error::Session`] when there is no authenticated session; transport
    /// errors from the connection manager otherwise.
    pub async fn connect(&self) -> Result<()> {
        let state = self.session.snapshot().await;
        let token = match (state.is_authenticated, state.token) {
            (true, Some(token)) => token,
            _ => return Err(Error::Session("Not authenticated".to_string())),
        };
        self.connection.connect(&self.settings.socket_url, &token).await
    }

    /// Record a successful interactive login and connect
    ///
    /// A login for a different identity drops any connection authenticated
    /// with the previous token.
    pub async fn login(&self, user: UserRecord, token: String) {
        let identity_changed = self
            .session
            .update(|s| {
                let previous = s.state();
                let changed = previous.token.as_deref() != Some(token.as_str())
                    || previous.user.as_ref().map(|u| u.id.as_str()) != Some(user.id.as_str());
                s.login_success(user, token);
                changed
            })
            .await;
        if identity_changed {
            self.connection.disconnect();
        }
        if let Err(e) = self.connect().await {
            warn!("Realtime connection unavailable after login: {}", e);
        }
    }

    /// Log out: tear down the connection, clear the session
    ///
    /// Unread counters survive unless `reset_unread_on_logout` is set.
    pub async fn logout(&self) {
        self.connection.disconnect();
        self.session.update(|s| s.logout()).await;
        if self.settings.reset_unread_on_logout {
            self.notifications.clear();
        }
        info!("Client logged out");
    }

    /// Current session snapshot
    pub async fn session_state(&self) -> SessionState {
        self.session.snapshot().await
    }

    /// Release the connection
    pub fn dispose(&self) {
        self.connection.disconnect();
    }
}

impl Drop for StaffwireClient {
    fn drop(&mut self) {
        self.dispose();
    }
}
