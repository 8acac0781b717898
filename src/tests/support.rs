// Shared test helpers: fake session validator, recording navigator, polling

use crate::bootstrap::SessionValidator;
use crate::guard::Navigator;
use crate::session::UserRecord;
use crate::{Error, Result};
use async_trait::async_trait;
use std::cell::RefCell;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

pub fn test_user(id: &str) -> UserRecord {
    UserRecord::new(id, &format!("{}@example.com", id), "client")
}

/// What the fake validator answers
#[derive(Debug, Clone)]
pub enum Verdict {
    Accept(UserRecord),
    Reject(u16),
    NetworkDown,
}

/// Validator with a scripted verdict and an optional gate
pub struct FakeValidator {
    verdict: Verdict,
    calls: AtomicUsize,
    tokens: Mutex<Vec<String>>,
    gate: Option<Notify>,
    entered: Notify,
}

impl FakeValidator {
    pub fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            calls: AtomicUsize::new(0),
            tokens: Mutex::new(Vec::new()),
            gate: None,
            entered: Notify::new(),
        }
    }

    /// Hold every validation until `release` is called
    pub fn gated(verdict: Verdict) -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::new(verdict)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    /// Wait until a validation call is in flight
    pub async fn entered(&self) {
        if self.calls() == 0 {
            self.entered.notified().await;
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }
}

#[async_trait]
impl SessionValidator for FakeValidator {
    async fn validate(&self, token: &str) -> Result<UserRecord> {
        self.tokens.lock().unwrap().push(token.to_string());
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.verdict {
            Verdict::Accept(user) => Ok(user.clone()),
            Verdict::Reject(status) => Err(Error::SessionRejected(*status)),
            Verdict::NetworkDown => Err(Error::Session("connection refused".to_string())),
        }
    }
}

/// Navigator that records every redirect
#[derive(Default)]
pub struct RecordingNavigator {
    pub redirects: RefCell<Vec<String>>,
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, route: &str) {
        self.redirects.borrow_mut().push(route.to_string());
    }
}

/// Poll `condition` until it holds, failing the test after two seconds
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("condition not reached within 2s");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
