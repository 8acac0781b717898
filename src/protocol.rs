//! Protocol module
//!
//! This module defines the realtime message envelope including:
//! - Chat message records exchanged with the server
//! - Client frames (authentication handshake, outgoing messages)
//! - Typed decoding of server events

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unread counter category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Regular conversation between marketplace users
    General,
    /// Conversation with the support team
    Support,
}

/// A chat message as carried by the realtime channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server-assigned message identifier
    pub id: String,
    /// Sender user identifier
    pub sender_id: String,
    /// Sender role (e.g. "client", "talent", "admin")
    pub sender_role: String,
    /// Receiver user identifier
    pub receiver_id: String,
    /// Message body
    pub content: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Whether this message belongs to a support conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_support: Option<bool>,
}

impl Message {
    /// Build a local echo for a message the current user just sent
    pub fn outgoing(
        sender_id: &str,
        sender_role: &str,
        receiver_id: &str,
        content: &str,
        is_support: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.to_string(),
            sender_role: sender_role.to_string(),
            receiver_id: receiver_id.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
            is_support: Some(is_support),
        }
    }

    /// Unread counter this message counts towards
    pub fn category(&self) -> Category {
        if self.is_support.unwrap_or(false) {
            Category::Support
        } else {
            Category::General
        }
    }
}

/// Frames sent from the client to the server
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Authentication handshake, sent as soon as the transport opens
    Auth {
        /// Session bearer token
        token: String,
    },
    /// Outgoing chat message
    Message {
        /// Receiver user identifier
        receiver_id: String,
        /// Message body
        content: String,
        /// Whether the message targets a support conversation
        #[serde(rename = "isSupport")]
        is_support: bool,
    },
}

impl ClientFrame {
    /// Encode the frame as a JSON text frame
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::JsonSerialization)
    }
}

/// Payload of an `unreadCount` event
///
/// The server sends either the split counters or a bare total. A bare total
/// is attributed to the general category.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum UnreadPayload {
    /// Per-category counters
    Split {
        /// General unread count
        general: f64,
        /// Support unread count
        #[serde(default)]
        support: f64,
    },
    /// Bare numeric total
    Total(f64),
    /// Numeric total sent as a string
    Text(String),
}

impl UnreadPayload {
    /// Normalize to `(general, support)` counters
    ///
    /// Negative, fractional and non-finite values are coerced to whole,
    /// non-negative counts.
    pub fn counts(&self) -> Result<(u32, u32)> {
        match self {
            UnreadPayload::Split { general, support } => {
                Ok((coerce_count(*general), coerce_count(*support)))
            }
            UnreadPayload::Total(total) => Ok((coerce_count(*total), 0)),
            UnreadPayload::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok((0, 0));
                }
                let total: f64 = trimmed
                    .parse()
                    .map_err(|_| Error::Decode(format!("Non-numeric unread count: {:?}", text)))?;
                Ok((coerce_count(total), 0))
            }
        }
    }
}

fn coerce_count(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        0
    } else if value >= u32::MAX as f64 {
        u32::MAX
    } else {
        value.floor() as u32
    }
}

/// Events pushed by the server
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Acknowledgment of the authentication handshake
    #[serde(rename = "authenticated")]
    Authenticated,
    /// Absolute unread counters
    #[serde(rename = "unreadCount")]
    UnreadCount {
        /// Counter payload
        data: UnreadPayload,
    },
    /// A new inbound chat message
    #[serde(rename = "new_message")]
    NewMessage {
        /// The message
        message: Message,
    },
    /// Server-side error to surface to the user
    #[serde(rename = "error")]
    Error {
        /// Human readable error text
        #[serde(default)]
        message: String,
    },
}

impl ServerEvent {
    /// Decode a text frame into a typed event
    ///
    /// Unknown `type` values and malformed JSON both yield [`Error::Decode`].
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Decode(e.to_string()))
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Authenticated => "authenticated",
            ServerEvent::UnreadCount { .. } => "unreadCount",
            ServerEvent::NewMessage { .. } => "new_message",
            ServerEvent::Error { .. } => "error",
        }
    }
}
