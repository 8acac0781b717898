//! Client configuration

use crate::reconnect::ReconnectPolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client settings
///
/// Stored in JSON format and loaded from disk at startup. Missing fields
/// take their default values.
///
/// # Example
/// ```rust,no_run
/// use staffwire::storage::ClientSettings;
///
/// // Load settings (returns default if file doesn't exist)
/// let mut settings = ClientSettings::load("staffwire.json").expect("Failed to load");
///
/// settings.reset_unread_on_logout = true;
/// settings.save("staffwire.json").expect("Failed to save");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Base URL of the REST API (session validation lives under it)
    pub api_base_url: String,
    /// WebSocket endpoint for realtime messaging
    pub socket_url: String,
    /// Directory for durable client storage
    pub storage_path: String,
    /// Timeout for opening the realtime transport in milliseconds
    pub connect_timeout_ms: u64,
    /// Only report the connection open after the server acknowledges auth
    pub require_auth_ack: bool,
    /// Zero the unread counters when the user logs out
    pub reset_unread_on_logout: bool,
    /// Reconnection after a server-side close
    pub reconnect: ReconnectPolicy,
    /// Route unauthenticated users are sent to
    pub login_route: String,
    /// Route authenticated users are sent to from guest-only views
    pub dashboard_route: String,
}

impl ClientSettings {
    /// Load settings from a JSON file
    ///
    /// # Returns
    /// The loaded settings, or default settings if the file doesn't exist or is empty
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read settings: {}", e)))?;

        if data.trim().is_empty() {
            return Ok(Self::default());
        }

        let settings: Self = serde_json::from_str(&data)
            .map_err(|e| Error::Config(format!("Failed to parse settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to a JSON file
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create settings directory: {}", e)))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(path, json)
            .map_err(|e| Error::Config(format!("Failed to write settings: {}", e)))?;

        Ok(())
    }

    /// Check values that serde alone cannot
    pub fn validate(&self) -> Result<()> {
        if !(self.socket_url.starts_with("ws://") || self.socket_url.starts_with("wss://")) {
            return Err(Error::Config(format!(
                "socket_url must use ws:// or wss://, got {}",
                self.socket_url
            )));
        }
        if !(self.api_base_url.starts_with("http://")
            || self.api_base_url.starts_with("https://"))
        {
            return Err(Error::Config(format!(
                "api_base_url must use http:// or https://, got {}",
                self.api_base_url
            )));
        }
        if self.connect_timeout_ms == 0 {
            return Err(Error::Config("connect_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Transport open timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
            socket_url: "ws://localhost:5000/ws".to_string(),
            storage_path: "./data".to_string(),
            connect_timeout_ms: 10_000,
            require_auth_ack: false,
            reset_unread_on_logout: false,
            reconnect: ReconnectPolicy::none(),
            login_route: "/login".to_string(),
            dashboard_route: "/dashboard".to_string(),
        }
    }
}
