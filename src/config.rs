use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Application configuration loaded from environment variables or TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// OAuth client ID registered with Google.
    #[serde(default)]
    pub client_id: String,
    /// OAuth client secret. Required by Google for web-application clients.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Optional API key appended to every reporting request.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// Where Google redirects after consent. Must match the OAuth client registration.
    #[serde(default = "default_redirect_url")]
    pub redirect_url: String,
    /// Fallback GA4 property used for the traffic report.
    #[serde(default)]
    pub analytics_property_id: Option<String>,
    /// Per-target GA4 property overrides, keyed by Search Console site URL.
    #[serde(default)]
    pub analytics_properties: HashMap<String, String>,
    /// Dashboard origin for CORS restrictions on API routes.
    /// If not set, API routes allow any origin.
    #[serde(default)]
    pub dashboard_origin: Option<String>,
    /// Upstream request timeout in seconds. 0 = no timeout.
    #[serde(default)]
    pub upstream_timeout_secs: u64,
    #[serde(default = "default_search_api_base")]
    pub search_api_base: String,
    #[serde(default = "default_analytics_api_base")]
    pub analytics_api_base: String,
    #[serde(default = "default_oauth_authorize_url")]
    pub oauth_authorize_url: String,
    #[serde(default = "default_oauth_token_url")]
    pub oauth_token_url: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    8000
}

fn default_scopes() -> Vec<String> {
    vec![
        "https://www.googleapis.com/auth/webmasters".to_string(),
        "https://www.googleapis.com/auth/analytics".to_string(),
        "https://www.googleapis.com/auth/analytics.readonly".to_string(),
    ]
}

fn default_redirect_url() -> String {
    "http://localhost:8000/api/auth/callback".to_string()
}

fn default_search_api_base() -> String {
    "https://www.googleapis.com/webmasters/v3".to_string()
}

fn default_analytics_api_base() -> String {
    "https://analyticsdata.googleapis.com/v1beta".to_string()
}

fn default_oauth_authorize_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_oauth_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client_id: String::new(),
            client_secret: None,
            api_key: None,
            scopes: default_scopes(),
            redirect_url: default_redirect_url(),
            analytics_property_id: None,
            analytics_properties: HashMap::new(),
            dashboard_origin: None,
            upstream_timeout_secs: 0,
            search_api_base: default_search_api_base(),
            analytics_api_base: default_analytics_api_base(),
            oauth_authorize_url: default_oauth_authorize_url(),
            oauth_token_url: default_oauth_token_url(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults.
    ///
    /// Environment variables override file values:
    /// - `SEO_DASHBOARD_HOST` → host
    /// - `SEO_DASHBOARD_PORT` → port
    /// - `SEO_DASHBOARD_CLIENT_ID` → client_id
    /// - `SEO_DASHBOARD_CLIENT_SECRET` → client_secret
    /// - `SEO_DASHBOARD_API_KEY` → api_key
    /// - `SEO_DASHBOARD_REDIRECT_URL` → redirect_url
    /// - `SEO_DASHBOARD_GA_PROPERTY` → analytics_property_id
    /// - `SEO_DASHBOARD_ORIGIN` → dashboard_origin
    /// - `SEO_DASHBOARD_UPSTREAM_TIMEOUT` → upstream_timeout_secs
    pub fn load(config_path: Option<&Path>) -> Self {
        let mut config =
            config_path.map_or_else(Self::default, |path| match std::fs::read_to_string(path) {
                Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                    tracing::warn!("Failed to parse config file: {e}, using defaults");
                    Self::default()
                }),
                Err(e) => {
                    tracing::warn!("Failed to read config file: {e}, using defaults");
                    Self::default()
                }
            });

        if let Ok(host) = std::env::var("SEO_DASHBOARD_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("SEO_DASHBOARD_PORT") {
            if let Ok(p) = port.parse() {
                config.port = p;
            }
        }
        if let Ok(id) = std::env::var("SEO_DASHBOARD_CLIENT_ID") {
            config.client_id = id;
        }
        if let Ok(secret) = std::env::var("SEO_DASHBOARD_CLIENT_SECRET") {
            config.client_secret = Some(secret);
        }
        if let Ok(key) = std::env::var("SEO_DASHBOARD_API_KEY") {
            config.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("SEO_DASHBOARD_REDIRECT_URL") {
            config.redirect_url = url;
        }
        if let Ok(property) = std::env::var("SEO_DASHBOARD_GA_PROPERTY") {
            config.analytics_property_id = Some(property);
        }
        if let Ok(origin) = std::env::var("SEO_DASHBOARD_ORIGIN") {
            config.dashboard_origin = Some(origin);
        }
        if let Ok(val) = std::env::var("SEO_DASHBOARD_UPSTREAM_TIMEOUT") {
            if let Ok(t) = val.parse() {
                config.upstream_timeout_secs = t;
            }
        }

        config
    }

    /// Resolve the GA4 property reported alongside a Search Console target.
    ///
    /// The two are independent identifiers: a per-target entry wins, otherwise
    /// the global `analytics_property_id` is used.
    pub fn analytics_property_for(&self, target: &str) -> Option<&str> {
        self.analytics_properties
            .get(target)
            .map(String::as_str)
            .or(self.analytics_property_id.as_deref())
            .filter(|p| !p.is_empty())
    }
}
