use crate::aggregate::search::SearchReport;
use crate::aggregate::traffic::TrafficReport;
use crate::config::Config;
use crate::render::ChartRegistry;
use crate::report::error::ReportError;
use crate::report::google::{build_http_client, GoogleReportClient};
use crate::report::types::DateRange;
use crate::report::ReportSource;
use crate::session::init::InitState;
use crate::session::oauth::OAuthClient;
use crate::session::SessionGate;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Clients built during initialization.
#[derive(Clone)]
pub struct Upstream {
    pub source: Arc<dyn ReportSource>,
    pub oauth: OAuthClient,
}

impl Upstream {
    /// Google-backed clients sharing one HTTP connection pool.
    pub fn google(config: &Arc<Config>) -> Result<Self, ReportError> {
        let http = build_http_client(config).map_err(|e| ReportError::Init(e.to_string()))?;
        let source = GoogleReportClient::new(config, http.clone())
            .map_err(|e| ReportError::Init(e.to_string()))?;
        Ok(Self {
            source: Arc::new(source),
            oauth: OAuthClient::new(Arc::clone(config), http),
        })
    }
}

/// The aggregated views most recently produced for each dataset.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LatestViews {
    pub search: Option<SearchReport>,
    pub traffic: Option<TrafficReport>,
}

/// Single user-visible error message. Last write wins.
#[derive(Debug, Default)]
pub struct ErrorSlot(Mutex<Option<String>>);

impl ErrorSlot {
    pub fn set(&self, message: String) {
        *self.0.lock() = Some(message);
    }

    pub fn current(&self) -> Option<String> {
        self.0.lock().clone()
    }
}

/// Shared application state.
pub struct AppState {
    pub config: Arc<Config>,
    pub session: SessionGate,
    pub init: Mutex<InitState>,
    upstream: RwLock<Option<Upstream>>,
    pub charts: Mutex<ChartRegistry>,
    pub views: Mutex<LatestViews>,
    pub errors: ErrorSlot,
    in_flight: AtomicUsize,
    pub reports_generated_total: AtomicU64,
    pub fetch_failures_total: AtomicU64,
    listener_registered: AtomicBool,
}

impl AppState {
    /// Uninitialized state with the default trailing-month date range.
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            session: SessionGate::new(DateRange::trailing_month(Utc::now().date_naive())),
            init: Mutex::new(InitState::Uninitialized),
            upstream: RwLock::new(None),
            charts: Mutex::new(ChartRegistry::new()),
            views: Mutex::new(LatestViews::default()),
            errors: ErrorSlot::default(),
            in_flight: AtomicUsize::new(0),
            reports_generated_total: AtomicU64::new(0),
            fetch_failures_total: AtomicU64::new(0),
            listener_registered: AtomicBool::new(false),
        }
    }

    /// Ready state reading reports from `source` instead of Google.
    pub fn with_source(config: Config, source: Arc<dyn ReportSource>) -> Self {
        let state = Self::new(config);
        let oauth = OAuthClient::new(Arc::clone(&state.config), reqwest::Client::new());
        state.initialize_with(|_| Ok(Upstream { source, oauth }));
        state
    }

    /// Build the Google clients. Returns `true` once the state is `Ready`.
    pub fn initialize(&self) -> bool {
        self.initialize_with(Upstream::google)
    }

    /// Run one initialization attempt. A failure is recorded in the error slot
    /// and leaves the state `Failed`, from which a later attempt may start.
    pub fn initialize_with<F>(&self, build: F) -> bool
    where
        F: FnOnce(&Arc<Config>) -> Result<Upstream, ReportError>,
    {
        let started = self.init.lock().begin();
        if let Err(e) = started {
            tracing::debug!(error = %e, "Initialization not started");
            return e.from.is_ready();
        }

        match build(&self.config) {
            Ok(upstream) => {
                *self.upstream.write() = Some(upstream);
                let _ = self.init.lock().ready();
                tracing::info!("Reporting clients initialized");
                true
            }
            Err(e) => {
                let _ = self.init.lock().fail(e.to_string());
                self.record_error(&e);
                false
            }
        }
    }

    /// Start a fresh initialization attempt if the last one failed.
    /// Returns `true` when the clients are ready.
    pub fn retry_failed_init(&self) -> bool {
        match self.init_state() {
            InitState::Ready => true,
            InitState::Failed(reason) => {
                tracing::info!(%reason, "Retrying initialization");
                self.initialize()
            }
            InitState::Uninitialized | InitState::Loading => false,
        }
    }

    pub fn init_state(&self) -> InitState {
        self.init.lock().clone()
    }

    /// The report source, once initialization has succeeded.
    pub fn source(&self) -> Option<Arc<dyn ReportSource>> {
        self.upstream.read().as_ref().map(|u| Arc::clone(&u.source))
    }

    pub fn oauth(&self) -> Option<OAuthClient> {
        self.upstream.read().as_ref().map(|u| u.oauth.clone())
    }

    /// Log an error and show it to the user.
    pub fn record_error(&self, error: &ReportError) {
        tracing::error!(error = %error, "Dashboard error");
        self.errors.set(error.to_string());
    }

    /// Mark a fetch as running until the guard is dropped.
    pub fn loading_guard(&self) -> LoadingGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        LoadingGuard { state: self }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Relaxed) > 0
    }

    /// `true` for the first caller only.
    pub fn claim_signin_listener(&self) -> bool {
        !self.listener_registered.swap(true, Ordering::AcqRel)
    }
}

/// Decrements the in-flight counter on drop.
pub struct LoadingGuard<'a> {
    state: &'a AppState,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
