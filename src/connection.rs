//! Realtime connection manager
//!
//! This module owns the single duplex connection to the server:
//! - Authentication handshake as soon as the transport opens
//! - Typed dispatch of server events into the unread counters and message log
//! - Sending chat messages while the connection is open
//! - Optional reconnection after a server-side close
//!
//! Connection states move `Disconnected → Connecting → Authenticating → Open`
//! and back to `Disconnected`. A connect request while any attempt is in
//! flight or open is a no-op, so at most one transport exists at a time.

use crate::notifications::{SharedNotifications, UnreadCount};
use crate::protocol::{ClientFrame, Message, ServerEvent};
use crate::reconnect::ReconnectPolicy;
use crate::storage::ClientSettings;
use crate::transport::{Connector, Outbound};
use crate::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport
    Disconnected,
    /// Opening the transport (or waiting to reconnect)
    Connecting,
    /// Transport open, waiting for the server to acknowledge auth
    Authenticating,
    /// Ready to send
    Open,
}

/// Severity of a transient user notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    /// Informational (e.g. a new message arrived)
    Info,
    /// Error pushed by the server
    Error,
}

/// Transient user-visible notification
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    /// Severity
    pub level: ToastLevel,
    /// Text to show
    pub text: String,
}

impl Toast {
    fn new_message(message: &Message) -> Self {
        const PREVIEW_CHARS: usize = 80;
        let mut preview: String = message.content.chars().take(PREVIEW_CHARS).collect();
        if message.content.chars().count() > PREVIEW_CHARS {
            preview.push('…');
        }
        Self {
            level: ToastLevel::Info,
            text: format!("New message: {}", preview),
        }
    }

    fn error(text: String) -> Self {
        Self {
            level: ToastLevel::Error,
            text,
        }
    }
}

/// Callback type for surfacing transient notifications
pub type NotificationHandler = Arc<dyn Fn(Toast) + Send + Sync>;

/// Behaviour switches for the connection manager
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionOptions {
    /// Stay in `Authenticating` until the server sends `authenticated`
    pub require_auth_ack: bool,
    /// What to do after a server-side close
    pub reconnect: ReconnectPolicy,
}

impl From<&ClientSettings> for ConnectionOptions {
    fn from(settings: &ClientSettings) -> Self {
        Self {
            require_auth_ack: settings.require_auth_ack,
            reconnect: settings.reconnect.clone(),
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: ConnectionState,
    /// Identifies the current connection; bumped by every connect and disconnect
    generation: u64,
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
    messages: Vec<Message>,
    /// Last url/token, reused by reconnection
    target: Option<(String, String)>,
}

/// Realtime connection manager
///
/// Cheap to clone; clones share the same connection.
///
/// # Example
/// ```rust,no_run
/// use staffwire::connection::{ConnectionManager, ConnectionOptions};
/// use staffwire::notifications::SharedNotifications;
/// use staffwire::storage::MemoryStore;
/// use staffwire::transport::WsConnector;
/// use std::sync::Arc;
///
/// # async fn example() -> staffwire::Result<()> {
/// let notifications = SharedNotifications::new(Arc::new(MemoryStore::new()));
/// let manager = ConnectionManager::new(
///     Arc::new(WsConnector::default()),
///     notifications,
///     ConnectionOptions::default(),
/// );
///
/// manager.connect("ws://localhost:5000/ws", "token").await?;
/// if !manager.send_message("user_42", "Hello!", false) {
///     println!("Not connected, try again later");
/// }
/// manager.disconnect();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    notifications: SharedNotifications,
    options: ConnectionOptions,
    inner: Arc<Mutex<Inner>>,
    notification_handler: Arc<RwLock<Option<NotificationHandler>>>,
}

impl ConnectionManager {
    /// Create a disconnected manager
    pub fn new(
        connector: Arc<dyn Connector>,
        notifications: SharedNotifications,
        options: ConnectionOptions,
    ) -> Self {
        Self {
            connector,
            notifications,
            options,
            inner: Arc::new(Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                generation: 0,
                outbound: None,
                messages: Vec::new(),
                target: None,
            })),
            notification_handler: Arc::new(RwLock::new(None)),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Set the callback receiving transient notifications
    pub fn set_notification_handler<F>(&self, handler: F)
    where
        F: Fn(Toast) + Send + Sync + 'static,
    {
        let mut guard = self
            .notification_handler
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(Arc::new(handler));
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        self.inner().state
    }

    /// Whether messages can be sent right now
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Message log in arrival order
    pub fn messages(&self) -> Vec<Message> {
        self.inner().messages.clone()
    }

    /// Current unread counters
    pub fn unread(&self) -> UnreadCount {
        self.notifications.counts()
    }

    /// Unread counter store fed by this connection
    pub fn notifications(&self) -> &SharedNotifications {
        &self.notifications
    }

    /// Open the connection and authenticate with `token`
    ///
    /// Does nothing if an attempt is already in flight or open.
    ///
    /// # Errors
    /// [`Error::Transport`] if the transport cannot be opened; the manager is
    /// left `Disconnected`.
    pub async fn connect(&self, url: &str, token: &str) -> Result<()> {
        let generation = {
            let mut inner = self.inner();
            if inner.state != ConnectionState::Disconnected {
                debug!("Connect ignored, connection is {:?}", inner.state);
                return Ok(());
            }
            inner.generation += 1;
            inner.state = ConnectionState::Connecting;
            inner.target = Some((url.to_string(), token.to_string()));
            inner.generation
        };

        info!("Connecting to {}", url);
        match self.establish(generation, url, token).await {
            Ok(Some(inbound)) => {
                tokio::spawn(self.clone().run(generation, inbound));
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                error!("Connection to {} failed: {}", url, e);
                let mut inner = self.inner();
                if inner.generation == generation {
                    inner.state = ConnectionState::Disconnected;
                    inner.outbound = None;
                }
                Err(e)
            }
        }
    }

    /// Close the connection immediately and clear the message log
    ///
    /// Cancels any pending reconnection. Safe to call in any state.
    pub fn disconnect(&self) {
        let mut inner = self.inner();
        inner.generation += 1;
        if let Some(outbound) = inner.outbound.take() {
            let _ = outbound.send(Outbound::Close);
        }
        if inner.state != ConnectionState::Disconnected {
            info!("Disconnected");
        }
        inner.state = ConnectionState::Disconnected;
        inner.target = None;
        inner.messages.clear();
    }

    /// Send a chat message
    ///
    /// Returns `true` iff the connection is open and the frame was handed to
    /// the transport. Never queues.
    pub fn send_message(&self, receiver_id: &str, content: &str, is_support: bool) -> bool {
        let inner = self.inner();
        if inner.state != ConnectionState::Open {
            debug!("Send refused, connection is {:?}", inner.state);
            return false;
        }
        let Some(outbound) = inner.outbound.as_ref() else {
            return false;
        };

        let frame = ClientFrame::Message {
            receiver_id: receiver_id.to_string(),
            content: content.to_string(),
            is_support,
        };
        match frame.to_json() {
            Ok(json) => outbound.send(Outbound::Text(json)).is_ok(),
            Err(e) => {
                error!("Failed to encode message: {}", e);
                false
            }
        }
    }

    /// Append a message to the log
    pub fn add_message(&self, message: Message) {
        self.inner().messages.push(message);
    }

    /// Open a transport for `generation` and send the auth frame
    ///
    /// `Ok(None)` means the attempt was superseded by a disconnect.
    async fn establish(
        &self,
        generation: u64,
        url: &str,
        token: &str,
    ) -> Result<Option<mpsc::UnboundedReceiver<String>>> {
        let link = self.connector.open(url).await?;
        let auth = ClientFrame::Auth {
            token: token.to_string(),
        }
        .to_json()?;

        let mut inner = self.inner();
        if inner.generation != generation {
            debug!("Connection attempt superseded, closing transport");
            let _ = link.outbound.send(Outbound::Close);
            return Ok(None);
        }

        link.outbound
            .send(Outbound::Text(auth))
            .map_err(|_| Error::Transport("Transport closed before auth".to_string()))?;

        inner.state = if self.options.require_auth_ack {
            ConnectionState::Authenticating
        } else {
            ConnectionState::Open
        };
        inner.outbound = Some(link.outbound);
        debug!("Auth sent, connection is {:?}", inner.state);
        Ok(Some(link.inbound))
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner().generation == generation
    }

    /// Reader loop: one per connection generation, so frames are handled FIFO
    async fn run(self, generation: u64, mut inbound: mpsc::UnboundedReceiver<String>) {
        loop {
            while let Some(frame) = inbound.recv().await {
                if !self.is_current(generation) {
                    return;
                }
                self.dispatch(&frame);
            }

            let target = {
                let mut inner = self.inner();
                if inner.generation != generation {
                    return;
                }
                info!("Connection closed by server");
                inner.outbound = None;
                inner.state = if self.options.reconnect.is_enabled() {
                    ConnectionState::Connecting
                } else {
                    ConnectionState::Disconnected
                };
                inner.target.clone()
            };

            match self.reconnect(generation, target).await {
                Some(next) => inbound = next,
                None => return,
            }
        }
    }

    async fn reconnect(
        &self,
        generation: u64,
        target: Option<(String, String)>,
    ) -> Option<mpsc::UnboundedReceiver<String>> {
        let (url, token) = target?;
        if !self.options.reconnect.is_enabled() {
            return None;
        }

        let mut attempt = 1;
        loop {
            let delay = self
                .options
                .reconnect
                .delay_for(attempt, &mut rand::thread_rng());
            let Some(delay) = delay else {
                warn!("Giving up reconnecting after {} attempts", attempt - 1);
                let mut inner = self.inner();
                if inner.generation == generation {
                    inner.state = ConnectionState::Disconnected;
                }
                return None;
            };

            info!("Reconnecting in {}ms (attempt {})", delay.as_millis(), attempt);
            tokio::time::sleep(delay).await;
            if !self.is_current(generation) {
                return None;
            }

            match self.establish(generation, &url, &token).await {
                Ok(Some(inbound)) => {
                    info!("Reconnected to {}", url);
                    return Some(inbound);
                }
                Ok(None) => return None,
                Err(e) => {
                    warn!("Reconnect attempt {} failed: {}", attempt, e);
                    attempt += 1;
                }
            }
        }
    }

    /// Handle one inbound frame; malformed frames are logged and dropped
    fn dispatch(&self, frame: &str) {
        let event = match ServerEvent::decode(frame) {
            Ok(event) => event,
            Err(e) => {
                error!("Dropping inbound frame: {}", e);
                return;
            }
        };
        debug!("Received {} event", event.kind());

        match event {
            ServerEvent::Authenticated => {
                info!("Server acknowledged authentication");
                let mut inner = self.inner();
                if inner.state == ConnectionState::Authenticating {
                    inner.state = ConnectionState::Open;
                }
            }
            ServerEvent::UnreadCount { data } => match data.counts() {
                Ok((general, support)) => self.notifications.set_unread_count(general, support),
                Err(e) => error!("Dropping unread count: {}", e),
            },
            ServerEvent::NewMessage { message } => {
                let category = message.category();
                let toast = Toast::new_message(&message);
                self.add_message(message);
                self.notifications.increment_unread_count(category);
                self.notify(toast);
            }
            ServerEvent::Error { message } => {
                warn!("Server error: {}", message);
                self.notify(Toast::error(message));
            }
        }
    }

    fn notify(&self, toast: Toast) {
        let handler = self
            .notification_handler
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        match handler {
            Some(handler) => handler(toast),
            None => info!("Notification: {}", toast.text),
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state())
            .field("options", &self.options)
            .finish()
    }
}
