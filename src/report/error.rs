use std::fmt;

/// Failure talking to a Google API.
#[derive(Debug)]
pub enum UpstreamError {
    /// Connection, TLS or body-read failure.
    Transport(reqwest::Error),
    /// Non-success HTTP status. `message` is Google's error message when the
    /// body carried one.
    Status { status: u16, message: String },
    /// The response body did not match the expected shape.
    Decode(String),
    /// A request URL could not be built from the configured base.
    InvalidUrl(String),
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{e}"),
            Self::Status { status, message } => write!(f, "{message} (HTTP {status})"),
            Self::Decode(msg) => write!(f, "unexpected response: {msg}"),
            Self::InvalidUrl(msg) => write!(f, "invalid request URL: {msg}"),
        }
    }
}

impl std::error::Error for UpstreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e)
        }
    }
}

/// The user-facing error kinds. Each renders to the message shown in the
/// dashboard's error banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// Upstream clients could not be built.
    Init(String),
    /// Sign-in or token exchange failed.
    Auth(String),
    /// The Search Console site list could not be loaded.
    TargetList(String),
    /// The Search Console report request failed.
    SearchFetch(String),
    /// The GA4 report request failed.
    TrafficFetch(String),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(msg) => write!(f, "Failed to initialize reporting client: {msg}"),
            Self::Auth(msg) => write!(f, "Authentication error: {msg}"),
            Self::TargetList(msg) => write!(f, "Error loading site list: {msg}"),
            Self::SearchFetch(msg) => write!(f, "Error fetching Search Console data: {msg}"),
            Self::TrafficFetch(msg) => write!(f, "Error fetching Analytics data: {msg}"),
        }
    }
}

impl std::error::Error for ReportError {}
