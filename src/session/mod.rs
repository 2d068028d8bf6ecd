//! The session gate: sign-in state, selected site and date range.

pub mod init;
pub mod oauth;

use crate::report::types::{AccessToken, DateRange, TargetId};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;

/// Everything a report fetch needs, handed out only when fetching is allowed.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub token: AccessToken,
    pub target: TargetId,
    pub range: DateRange,
}

/// Serializable view of the gate for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub authenticated: bool,
    pub targets: Vec<TargetId>,
    pub selected_target: Option<TargetId>,
    pub date_range: DateRange,
}

struct SessionInner {
    token: Option<AccessToken>,
    targets: Vec<TargetId>,
    selected: Option<TargetId>,
    range: DateRange,
}

/// Single-user session state.
///
/// Sign-in changes are published on a watch channel so other tasks can react
/// to them (see [`init::spawn_signin_listener`]).
pub struct SessionGate {
    inner: Mutex<SessionInner>,
    signed_in: watch::Sender<bool>,
}

impl SessionGate {
    pub fn new(range: DateRange) -> Self {
        let (signed_in, _) = watch::channel(false);
        Self {
            inner: Mutex::new(SessionInner {
                token: None,
                targets: Vec::new(),
                selected: None,
                range,
            }),
            signed_in,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.lock().token.is_some()
    }

    pub fn selected_target(&self) -> Option<TargetId> {
        self.inner.lock().selected.clone()
    }

    /// Select a target. An empty id clears the selection.
    pub fn set_target(&self, id: &str) {
        let selected = (!id.is_empty()).then(|| TargetId::new(id));
        self.inner.lock().selected = selected;
    }

    pub fn date_range(&self) -> DateRange {
        self.inner.lock().range
    }

    pub fn set_date_range(&self, range: DateRange) {
        self.inner.lock().range = range;
    }

    pub fn targets(&self) -> Vec<TargetId> {
        self.inner.lock().targets.clone()
    }

    /// Store the site list. The first site becomes the selection when the
    /// list is non-empty.
    pub fn set_targets(&self, targets: Vec<TargetId>) {
        let mut inner = self.inner.lock();
        if let Some(first) = targets.first() {
            inner.selected = Some(first.clone());
        }
        inner.targets = targets;
    }

    pub fn token(&self) -> Option<AccessToken> {
        self.inner.lock().token.clone()
    }

    pub fn sign_in(&self, token: AccessToken) {
        self.inner.lock().token = Some(token);
        self.signed_in.send_replace(true);
        tracing::info!("Signed in");
    }

    pub fn sign_out(&self) {
        self.inner.lock().token = None;
        self.signed_in.send_replace(false);
        tracing::info!("Signed out");
    }

    /// Receiver that observes every sign-in / sign-out transition.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.signed_in.subscribe()
    }

    /// The inputs for a report fetch, or `None` when signed out or no target
    /// is selected. Callers treat `None` as "do nothing".
    pub fn report_request(&self) -> Option<ReportRequest> {
        let inner = self.inner.lock();
        Some(ReportRequest {
            token: inner.token.clone()?,
            target: inner.selected.clone()?,
            range: inner.range,
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock();
        SessionSnapshot {
            authenticated: inner.token.is_some(),
            targets: inner.targets.clone(),
            selected_target: inner.selected.clone(),
            date_range: inner.range,
        }
    }
}
