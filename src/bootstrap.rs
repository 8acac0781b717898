//! Session bootstrap
//!
//! Runs once per application load: adopts the persisted token, shows the
//! persisted user optimistically, then confirms the session with the server.
//! A failed confirmation means "not logged in"; it is never retried.

use crate::session::{SessionManager, UserRecord};
use crate::storage::{DurableStore, TOKEN_KEY, USER_KEY};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Server-side "who am I" check
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Return the authoritative user for `token`
    ///
    /// # Errors
    /// [`Error::SessionRejected`] when the server refuses the token; any other
    /// error for network or decoding failures.
    async fn validate(&self, token: &str) -> Result<UserRecord>;
}

/// Validator calling `GET {base}/auth/me` with a bearer token
#[derive(Debug, Clone)]
pub struct HttpSessionValidator {
    client: reqwest::Client,
    base_url: String,
}

/// The endpoint answers with the user either bare or wrapped
#[derive(Deserialize)]
#[serde(untagged)]
enum MeResponse {
    User { user: UserRecord },
    Data { data: UserRecord },
    Bare(UserRecord),
}

impl HttpSessionValidator {
    /// Create a validator for the API rooted at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Full URL of the validation endpoint
    pub fn endpoint(&self) -> String {
        format!("{}/auth/me", self.base_url)
    }
}

#[async_trait]
impl SessionValidator for HttpSessionValidator {
    async fn validate(&self, token: &str) -> Result<UserRecord> {
        let url = self.endpoint();
        debug!("Validating session against {}", url);

        let response = self.client.get(&url).bearer_auth(token).send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::SessionRejected(status.as_u16()));
        }
        if !status.is_success() {
            return Err(Error::Session(format!("Validation failed with status {}", status)));
        }

        let body = response.text().await?;
        let user = match serde_json::from_str::<MeResponse>(&body)
            .map_err(|e| Error::Session(format!("Malformed user record: {}", e)))?
        {
            MeResponse::User { user } => user,
            MeResponse::Data { data } => data,
            MeResponse::Bare(user) => user,
        };
        Ok(user)
    }
}

/// How a bootstrap run ended
#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapOutcome {
    /// No persisted token; the session stays logged out
    NoToken,
    /// The server confirmed the session
    Validated(UserRecord),
    /// The server (or the network) rejected the session; it was cleared
    Expired,
    /// The identity changed while validating; the result was discarded
    Superseded,
}

/// One-shot session bootstrapper
pub struct SessionBootstrapper {
    session: SessionManager,
    validator: Arc<dyn SessionValidator>,
}

impl SessionBootstrapper {
    /// Create a bootstrapper for `session`
    pub fn new(session: SessionManager, validator: Arc<dyn SessionValidator>) -> Self {
        Self { session, validator }
    }

    /// Run the bootstrap sequence
    ///
    /// `is_initializing` is cleared on every path.
    pub async fn run(&self) -> BootstrapOutcome {
        let outcome = self.reconcile().await;
        self.session.update(|s| s.finish_initializing()).await;
        info!("Session bootstrap finished: {}", outcome_label(&outcome));
        outcome
    }

    async fn reconcile(&self) -> BootstrapOutcome {
        let storage = self.session.storage().clone();

        let token = match read_key(storage.as_ref(), TOKEN_KEY) {
            Some(token) if !token.trim().is_empty() => token,
            _ => {
                debug!("No persisted token");
                return BootstrapOutcome::NoToken;
            }
        };

        let snapshot = read_key(storage.as_ref(), USER_KEY).and_then(|raw| {
            serde_json::from_str::<UserRecord>(&raw)
                .map_err(|e| warn!("Ignoring unreadable user snapshot: {}", e))
                .ok()
        });

        let epoch = self
            .session
            .update(|s| {
                s.restore(token.clone(), snapshot);
                s.epoch()
            })
            .await;

        let result = self.validator.validate(&token).await;

        self.session
            .update(|s| {
                if s.epoch() != epoch {
                    debug!("Discarding stale validation result");
                    return BootstrapOutcome::Superseded;
                }
                match result {
                    Ok(user) => {
                        s.set_user(Some(user.clone()));
                        BootstrapOutcome::Validated(user)
                    }
                    Err(e) => {
                        warn!("Session validation failed: {}", e);
                        s.expire();
                        BootstrapOutcome::Expired
                    }
                }
            })
            .await
    }
}

fn read_key(storage: &dyn DurableStore, key: &str) -> Option<String> {
    match storage.get(key) {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to read {}: {}", key, e);
            None
        }
    }
}

fn outcome_label(outcome: &BootstrapOutcome) -> &'static str {
    match outcome {
        BootstrapOutcome::NoToken => "no token",
        BootstrapOutcome::Validated(_) => "validated",
        BootstrapOutcome::Expired => "expired",
        BootstrapOutcome::Superseded => "superseded",
    }
}
