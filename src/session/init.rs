//! Startup state machine and the sign-in listener.

use crate::report::error::ReportError;
use crate::state::AppState;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Weak};

/// Lifecycle of the upstream clients.
///
/// `Uninitialized → Loading → Ready | Failed`, and `Failed → Loading` to try
/// again. No other transition is allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum InitState {
    #[default]
    Uninitialized,
    Loading,
    Ready,
    Failed(String),
}

/// Attempted transition that the state machine does not allow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitError {
    pub from: InitState,
    pub to: &'static str,
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot move from {:?} to {}", self.from, self.to)
    }
}

impl std::error::Error for InitError {}

impl InitState {
    pub fn begin(&mut self) -> Result<(), InitError> {
        match self {
            Self::Uninitialized | Self::Failed(_) => {
                *self = Self::Loading;
                Ok(())
            }
            _ => Err(self.reject("loading")),
        }
    }

    pub fn ready(&mut self) -> Result<(), InitError> {
        match self {
            Self::Loading => {
                *self = Self::Ready;
                Ok(())
            }
            _ => Err(self.reject("ready")),
        }
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), InitError> {
        match self {
            Self::Loading => {
                *self = Self::Failed(message.into());
                Ok(())
            }
            _ => Err(self.reject("failed")),
        }
    }

    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    fn reject(&self, to: &'static str) -> InitError {
        InitError {
            from: self.clone(),
            to,
        }
    }
}

/// Register the process-wide sign-in listener.
///
/// Every transition to signed-in loads the site list. Only the first call
/// registers a listener; later calls return `false` and do nothing. The task
/// ends once the state is dropped.
pub fn spawn_signin_listener(state: Arc<AppState>) -> bool {
    if !state.claim_signin_listener() {
        tracing::debug!("Sign-in listener already registered");
        return false;
    }

    let mut rx = state.session.subscribe();
    let state: Weak<AppState> = Arc::downgrade(&state);
    tokio::spawn(async move {
        // Handle the state as it is at registration, then every change.
        let mut signed_in = *rx.borrow_and_update();
        loop {
            if signed_in {
                let Some(state) = state.upgrade() else {
                    break;
                };
                load_targets(&state).await;
            }
            // Fails once the session's sender is dropped with the state.
            if rx.changed().await.is_err() {
                break;
            }
            signed_in = *rx.borrow_and_update();
        }
        tracing::debug!("Sign-in listener stopped");
    });
    true
}

/// Fetch the account's site list into the session, selecting the first site.
pub async fn load_targets(state: &AppState) {
    let Some(source) = state.source() else {
        return;
    };
    let Some(token) = state.session.token() else {
        return;
    };

    let _loading = state.loading_guard();
    match source.list_targets(&token).await {
        Ok(targets) => {
            tracing::info!(count = targets.len(), "Loaded site list");
            state.session.set_targets(targets);
        }
        Err(e) => state.record_error(&ReportError::TargetList(e.to_string())),
    }
}
