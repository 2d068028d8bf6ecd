//! Google OAuth 2.0 authorization-code flow with PKCE.

use crate::config::Config;
use crate::report::types::AccessToken;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;
use reqwest::{Client, Url};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long a started login may take before its `state` is forgotten.
const PENDING_LOGIN_TTL: Duration = Duration::from_secs(600);

/// A login in progress: where to send the user and the `state` to expect back.
#[derive(Debug, Clone)]
pub struct LoginRedirect {
    pub url: String,
    pub state: String,
}

struct PendingLogin {
    verifier: String,
    created_at: Instant,
}

/// Failure starting a login or exchanging its code.
#[derive(Debug)]
pub enum OAuthError {
    /// No OAuth client id in the config.
    NotConfigured,
    /// The configured authorize URL does not parse.
    InvalidUrl(String),
    /// The token request never got a response.
    Transport(reqwest::Error),
    /// The token endpoint answered with an error status. `message` is the
    /// endpoint's `error_description` (or `error`) when the body carried one.
    Rejected { status: u16, message: Option<String> },
    /// A success response without a usable token.
    Decode(String),
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "OAuth client_id is not configured"),
            Self::InvalidUrl(msg) => write!(f, "invalid authorize URL: {msg}"),
            Self::Transport(e) => write!(f, "token request failed: {e}"),
            Self::Rejected {
                message: Some(message),
                ..
            } => write!(f, "{message}"),
            Self::Rejected {
                status,
                message: None,
            } => write!(f, "token endpoint returned HTTP {status}"),
            Self::Decode(msg) => write!(f, "invalid token response: {msg}"),
        }
    }
}

impl std::error::Error for OAuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Builds authorization URLs and exchanges codes for tokens.
#[derive(Clone)]
pub struct OAuthClient {
    http: Client,
    config: Arc<Config>,
    pending: Arc<Mutex<HashMap<String, PendingLogin>>>,
}

/// PKCE S256 challenge for `verifier`.
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn random_verifier() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

impl OAuthClient {
    pub fn new(config: Arc<Config>, http: Client) -> Self {
        Self {
            http,
            config,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start a login: remember a fresh PKCE verifier under a random `state`
    /// and return the consent-screen URL.
    pub fn begin_login(&self) -> Result<LoginRedirect, OAuthError> {
        if self.config.client_id.is_empty() {
            return Err(OAuthError::NotConfigured);
        }

        let state = uuid::Uuid::new_v4().to_string();
        let verifier = random_verifier();
        let challenge = code_challenge(&verifier);

        let mut url = Url::parse(&self.config.oauth_authorize_url)
            .map_err(|e| OAuthError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("access_type", "online")
            .append_pair("state", &state)
            .append_pair("code_challenge", &challenge)
            .append_pair("code_challenge_method", "S256");

        self.cleanup_expired();
        self.pending.lock().insert(
            state.clone(),
            PendingLogin {
                verifier,
                created_at: Instant::now(),
            },
        );

        Ok(LoginRedirect {
            url: url.into(),
            state,
        })
    }

    /// Consume the pending login for `state`, returning its verifier.
    /// Unknown and expired states yield `None`.
    pub fn take_verifier(&self, state: &str) -> Option<String> {
        let login = self.pending.lock().remove(state)?;
        (login.created_at.elapsed() <= PENDING_LOGIN_TTL).then_some(login.verifier)
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
    ) -> Result<AccessToken, OAuthError> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("code_verifier", verifier),
        ];
        if let Some(secret) = self.config.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let response = self
            .http
            .post(&self.config.oauth_token_url)
            .form(&form)
            .send()
            .await
            .map_err(OAuthError::Transport)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TokenErrorResponse>(&body)
                .ok()
                .map(|e| e.error_description.unwrap_or(e.error));
            return Err(OAuthError::Rejected { status, message });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| OAuthError::Decode(e.to_string()))?;
        Ok(AccessToken::new(token.access_token))
    }

    /// Drop logins that were never completed.
    pub fn cleanup_expired(&self) {
        self.pending
            .lock()
            .retain(|_, login| login.created_at.elapsed() <= PENDING_LOGIN_TTL);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(config: Config) -> OAuthClient {
        OAuthClient::new(Arc::new(config), Client::new())
    }

    fn configured() -> Config {
        Config {
            client_id: "id.apps.googleusercontent.com".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_code_challenge_rfc7636_vector() {
        assert_eq!(
            code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_begin_login_requires_client_id() {
        let err = client(Config::default()).begin_login().unwrap_err();
        assert!(matches!(err, OAuthError::NotConfigured));
        assert_eq!(err.to_string(), "OAuth client_id is not configured");
    }

    #[test]
    fn test_begin_login_url() {
        let oauth = client(configured());
        let login = oauth.begin_login().unwrap();
        let url = Url::parse(&login.url).unwrap();
        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(params["client_id"], "id.apps.googleusercontent.com");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["state"], login.state);
        assert_eq!(params["code_challenge_method"], "S256");
        assert!(params["scope"].contains("https://www.googleapis.com/auth/webmasters"));
        assert_eq!(oauth.pending_len(), 1);
    }

    #[test]
    fn test_verifier_is_single_use() {
        let oauth = client(configured());
        let login = oauth.begin_login().unwrap();
        assert!(oauth.take_verifier(&login.state).is_some());
        assert!(oauth.take_verifier(&login.state).is_none());
        assert!(oauth.take_verifier("unknown").is_none());
    }

    #[tokio::test]
    async fn test_exchange_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("code=abc"))
            .and(body_string_contains("code_verifier=ver"))
            .and(body_string_contains("client_secret=shh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.token",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let oauth = client(Config {
            oauth_token_url: format!("{}/token", server.uri()),
            client_secret: Some("shh".to_string()),
            ..configured()
        });
        let token = oauth.exchange_code("abc", "ver").await.unwrap();
        assert_eq!(token.secret(), "ya29.token");
    }

    #[tokio::test]
    async fn test_exchange_code_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Bad Request"
            })))
            .mount(&server)
            .await;

        let oauth = client(Config {
            oauth_token_url: format!("{}/token", server.uri()),
            ..configured()
        });
        let err = oauth.exchange_code("abc", "ver").await.unwrap_err();
        assert!(matches!(err, OAuthError::Rejected { status: 400, .. }));
        assert_eq!(err.to_string(), "Bad Request");
    }

    #[tokio::test]
    async fn test_exchange_code_error_without_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let oauth = client(Config {
            oauth_token_url: format!("{}/token", server.uri()),
            ..configured()
        });
        let err = oauth.exchange_code("abc", "ver").await.unwrap_err();
        assert!(matches!(
            err,
            OAuthError::Rejected {
                status: 503,
                message: None
            }
        ));
        assert_eq!(err.to_string(), "token endpoint returned HTTP 503");
    }

    #[tokio::test]
    async fn test_exchange_code_missing_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"token_type": "Bearer"})),
            )
            .mount(&server)
            .await;

        let oauth = client(Config {
            oauth_token_url: format!("{}/token", server.uri()),
            ..configured()
        });
        let err = oauth.exchange_code("abc", "ver").await.unwrap_err();
        assert!(matches!(err, OAuthError::Decode(_)));
        assert!(err.to_string().starts_with("invalid token response: "));
    }
}
