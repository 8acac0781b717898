//! Durable client storage
//!
//! This module handles everything that survives a process restart:
//! - The session token and user snapshot
//! - Persisted unread counters
//! - Client configuration
//!
//! The module is organized into submodules:
//! - `durable` - Key/value storage backends (file-backed and in-memory)
//! - `settings` - Client configuration loaded from JSON

pub mod durable;
pub mod settings;

pub use durable::{DurableStore, FileStore, MemoryStore};
pub use settings::ClientSettings;

/// Storage key for the session bearer token
pub const TOKEN_KEY: &str = "token";

/// Storage key for the serialized user snapshot
pub const USER_KEY: &str = "user";

/// Storage key for the serialized unread counters
pub const UNREAD_KEY: &str = "unread_counts";
