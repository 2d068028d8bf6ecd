use crate::api::errors::ApiError;
use crate::report::error::ReportError;
use crate::report::types::AccessToken;
use crate::session::oauth::OAuthClient;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

/// Query string Google appends to the redirect URL.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub access_token: String,
}

fn oauth_client(state: &AppState) -> Result<OAuthClient, ApiError> {
    state
        .oauth()
        .ok_or_else(|| ApiError::Unavailable("reporting clients are not initialized".to_string()))
}

/// Record an authentication failure and turn it into a response.
fn auth_failure(state: &AppState, message: impl Into<String>) -> ApiError {
    let error = ReportError::Auth(message.into());
    state.record_error(&error);
    ApiError::from(error)
}

/// GET /api/auth/login — Redirect to Google's consent screen.
pub async fn login(State(state): State<Arc<AppState>>) -> Result<Redirect, ApiError> {
    state.retry_failed_init();
    let oauth = oauth_client(&state)?;
    let login = oauth.begin_login().map_err(|e| auth_failure(&state, e.to_string()))?;
    tracing::debug!(state = %login.state, "Login started");
    Ok(Redirect::to(&login.url))
}

/// GET /api/auth/callback — Exchange the authorization code and sign in.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, ApiError> {
    if let Some(error) = params.error {
        return Err(auth_failure(&state, error));
    }
    let (Some(code), Some(login_state)) = (params.code, params.state) else {
        return Err(ApiError::BadRequest(
            "code and state are required".to_string(),
        ));
    };

    let oauth = oauth_client(&state)?;
    let verifier = oauth
        .take_verifier(&login_state)
        .ok_or_else(|| auth_failure(&state, "unknown or expired login state"))?;
    let token = oauth
        .exchange_code(&code, &verifier)
        .await
        .map_err(|e| auth_failure(&state, e.to_string()))?;

    state.session.sign_in(token);
    Ok(Redirect::to("/"))
}

/// POST /api/auth/token — Sign in with an access token obtained elsewhere.
pub async fn sign_in_with_token(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TokenRequest>,
) -> Result<StatusCode, ApiError> {
    let token = body.access_token.trim();
    if token.is_empty() {
        return Err(ApiError::BadRequest(
            "access_token must not be empty".to_string(),
        ));
    }
    state.session.sign_in(AccessToken::new(token));
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<Arc<AppState>>) -> StatusCode {
    state.session.sign_out();
    StatusCode::NO_CONTENT
}
