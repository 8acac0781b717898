//! In-process fake connector for tests
//!
//! Each successful [`FakeConnector::open`] creates a fresh channel pair and
//! parks the test-side [`FakeLinkHandle`] until the test takes it with
//! [`FakeConnector::take_link`].

use crate::transport::{Connector, Link, Outbound};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// Connector that never touches the network
#[derive(Debug, Default)]
pub struct FakeConnector {
    opens: AtomicUsize,
    failures_left: AtomicUsize,
    open_delay: Mutex<Duration>,
    links: Mutex<VecDeque<FakeLinkHandle>>,
    urls: Mutex<Vec<String>>,
}

/// Test side of one opened link
#[derive(Debug)]
pub struct FakeLinkHandle {
    /// Frames the client wrote
    pub outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    /// Push server frames here; `None` once closed
    pub inbound_tx: Option<mpsc::UnboundedSender<String>>,
}

impl FakeLinkHandle {
    /// Deliver a server frame; silently dropped once the client stopped reading
    pub fn push(&self, frame: &str) {
        if let Some(tx) = &self.inbound_tx {
            let _ = tx.send(frame.to_string());
        }
    }

    /// Deliver a JSON value as a server frame
    pub fn push_json(&self, value: serde_json::Value) {
        self.push(&value.to_string());
    }

    /// Simulate the server closing the transport
    pub fn close(&mut self) {
        self.inbound_tx = None;
    }

    /// Drain every frame written so far
    pub fn sent(&mut self) -> Vec<Outbound> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.outbound_rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// Drain written text frames, parsed as JSON
    pub fn sent_json(&mut self) -> Vec<serde_json::Value> {
        self.sent()
            .into_iter()
            .filter_map(|frame| match frame {
                Outbound::Text(text) => serde_json::from_str(&text).ok(),
                Outbound::Close => None,
            })
            .collect()
    }
}

impl FakeConnector {
    /// Create a connector whose opens succeed immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every open by `delay`
    pub fn set_open_delay(&self, delay: Duration) {
        *self.open_delay.lock().unwrap() = delay;
    }

    /// Make the next `count` opens fail
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Number of open attempts so far
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// URLs passed to `open`, in order
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    /// Take the oldest link not yet taken
    pub fn take_link(&self) -> FakeLinkHandle {
        self.links
            .lock()
            .unwrap()
            .pop_front()
            .expect("FakeConnector: no link opened")
    }

    /// Number of opened links not yet taken
    pub fn pending_links(&self) -> usize {
        self.links.lock().unwrap().len()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(&self, url: &str) -> Result<Link> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());

        let delay = *self.open_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::Transport("fake connect refused".to_string()));
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        self.links.lock().unwrap().push_back(FakeLinkHandle {
            outbound_rx,
            inbound_tx: Some(inbound_tx),
        });

        Ok(Link {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
