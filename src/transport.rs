//! Realtime transport module
//!
//! This module abstracts the duplex, message-oriented connection used for
//! realtime push:
//! - [`Connector`] opens a transport and hands back a [`Link`]
//! - [`WsConnector`] is the WebSocket implementation
//! - `fake::FakeConnector` is an in-process connector for tests
//!
//! A [`Link`] is a pair of channels. Text frames pushed on `outbound` are
//! written to the wire in order; inbound text frames arrive on `inbound` in
//! arrival order. The inbound channel closing means the transport closed.

use crate::{Error, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

/// Frame queued for the wire
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// JSON text frame
    Text(String),
    /// Close the transport
    Close,
}

/// Handle to an open transport
#[derive(Debug)]
pub struct Link {
    /// Frames to write
    pub outbound: mpsc::UnboundedSender<Outbound>,
    /// Frames read, closed when the transport closes
    pub inbound: mpsc::UnboundedReceiver<String>,
}

/// Opens realtime transports
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a transport to `url`
    ///
    /// # Errors
    /// [`Error::Transport`] if the transport cannot be opened.
    async fn open(&self, url: &str) -> Result<Link>;
}

/// WebSocket connector
#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: Duration,
}

impl WsConnector {
    /// Create a connector that gives up opening after `connect_timeout`
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, url: &str) -> Result<Link> {
        debug!("Opening WebSocket to {}", url);

        let (stream, _) = time::timeout(self.connect_timeout, tokio_tungstenite::connect_async(url))
            .await
            .map_err(|_| {
                Error::Transport(format!(
                    "Connect to {} timed out after {}ms",
                    url,
                    self.connect_timeout.as_millis()
                ))
            })?
            .map_err(|e| Error::Transport(format!("Failed to connect to {}: {}", url, e)))?;

        info!("WebSocket open to {}", url);

        let (mut write, mut read) = stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Outbound>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

        // Writer: drains outbound until Close or until every sender is gone
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                match frame {
                    Outbound::Text(text) => {
                        if let Err(e) = write.send(WsMessage::Text(text)).await {
                            warn!("WebSocket write failed: {}", e);
                            break;
                        }
                    }
                    Outbound::Close => break,
                }
            }
            if let Err(e) = write.close().await {
                debug!("WebSocket close: {}", e);
            }
        });

        // Reader: forwards text frames; dropping inbound_tx signals close
        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => {
                        if inbound_tx.send(text).is_err() {
                            break;
                        }
                    }
                    Ok(WsMessage::Binary(bytes)) => match String::from_utf8(bytes) {
                        Ok(text) => {
                            if inbound_tx.send(text).is_err() {
                                break;
                            }
                        }
                        Err(_) => warn!("Dropping non UTF-8 binary frame"),
                    },
                    Ok(WsMessage::Close(frame)) => {
                        debug!("WebSocket closed by server: {:?}", frame);
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("WebSocket read error: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Link {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

#[cfg(test)]
pub mod fake;
