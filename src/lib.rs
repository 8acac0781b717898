//! Staffwire - realtime messaging client for the staffing dashboard
//!
//! This library provides the session-aware realtime core of the dashboard:
//! session state and bootstrap, the WebSocket connection manager, persisted
//! unread counters and the route guards that gate protected views.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bootstrap;
pub mod client;
pub mod connection;
pub mod guard;
pub mod notifications;
pub mod protocol;
pub mod reconnect;
pub mod session;
pub mod storage;
pub mod transport;

#[cfg(test)]
mod tests;

/// Result type alias for Staffwire operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Staffwire operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Realtime transport error (connect, send, close)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Durable storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Session validation failed for a reason other than rejection
    #[error("Session error: {0}")]
    Session(String),

    /// The server rejected the session token (401/403)
    #[error("Session rejected with status {0}")]
    SessionRejected(u16),

    /// Inbound frame could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Initialize the Staffwire library with logging
///
/// Honours `RUST_LOG`; defaults to `info` for this crate.
pub fn init() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("staffwire=info"));
    // A subscriber may already be installed by the embedding application.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
