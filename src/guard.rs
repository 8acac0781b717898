//! Route guards
//!
//! Guards decide whether a view renders, shows a loading placeholder, or
//! sends the user elsewhere. They gate on the explicit `is_initializing`
//! flag so they behave correctly when mounted before the session bootstrap
//! has finished.

use crate::session::SessionState;
use std::sync::Mutex;
use tracing::debug;

/// What a guarded view should do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Show the loading placeholder
    Loading,
    /// Render nothing and navigate to the route
    Redirect(String),
    /// Render the guarded children
    Render,
}

/// Performs client-side navigation
pub trait Navigator {
    /// Navigate to `route`
    fn redirect(&self, route: &str);
}

/// A render gate over the session state
pub trait RouteGuard {
    /// Pure decision for `state`
    fn decide(&self, state: &SessionState) -> GuardOutcome;

    /// Remembered redirect, used to issue each redirect once
    fn last_redirect(&self) -> &Mutex<Option<String>>;

    /// Decide and, for a new redirect decision, navigate
    ///
    /// Re-evaluating with an unchanged redirect decision does not navigate
    /// again.
    fn evaluate(&self, state: &SessionState, navigator: &dyn Navigator) -> GuardOutcome {
        let outcome = self.decide(state);
        let mut last = self
            .last_redirect()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match &outcome {
            GuardOutcome::Redirect(route) => {
                if last.as_deref() != Some(route.as_str()) {
                    debug!("Guard redirecting to {}", route);
                    navigator.redirect(route);
                    *last = Some(route.clone());
                }
            }
            _ => *last = None,
        }
        outcome
    }
}

/// Gate for views that require a logged-in user
#[derive(Debug)]
pub struct ProtectedGuard {
    login_route: String,
    last_redirect: Mutex<Option<String>>,
}

impl ProtectedGuard {
    /// Guard sending unauthenticated users to `login_route`
    pub fn new(login_route: &str) -> Self {
        Self {
            login_route: login_route.to_string(),
            last_redirect: Mutex::new(None),
        }
    }
}

impl RouteGuard for ProtectedGuard {
    fn decide(&self, state: &SessionState) -> GuardOutcome {
        if state.is_initializing {
            GuardOutcome::Loading
        } else if !state.is_authenticated {
            GuardOutcome::Redirect(self.login_route.clone())
        } else {
            GuardOutcome::Render
        }
    }

    fn last_redirect(&self) -> &Mutex<Option<String>> {
        &self.last_redirect
    }
}

/// Gate for guest-only views such as login and signup
#[derive(Debug)]
pub struct GuestGuard {
    dashboard_route: String,
    last_redirect: Mutex<Option<String>>,
}

impl GuestGuard {
    /// Guard sending authenticated users to `dashboard_route`
    pub fn new(dashboard_route: &str) -> Self {
        Self {
            dashboard_route: dashboard_route.to_string(),
            last_redirect: Mutex::new(None),
        }
    }
}

impl RouteGuard for GuestGuard {
    fn decide(&self, state: &SessionState) -> GuardOutcome {
        if !state.is_initializing && state.is_authenticated {
            GuardOutcome::Redirect(self.dashboard_route.clone())
        } else {
            GuardOutcome::Render
        }
    }

    fn last_redirect(&self) -> &Mutex<Option<String>> {
        &self.last_redirect
    }
}
