use crate::report::error::ReportError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// API error type with HTTP status code mapping.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    /// Reporting clients are not initialized yet, or initialization failed.
    Unavailable(String),
    Report(ReportError),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            Self::Unavailable(msg) => write!(f, "Service unavailable: {msg}"),
            Self::Report(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) | Self::Report(ReportError::Init(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Report(ReportError::Auth(_)) => StatusCode::UNAUTHORIZED,
            Self::Report(_) => StatusCode::BAD_GATEWAY,
        };
        let message = match self {
            Self::BadRequest(msg) | Self::Unavailable(msg) => msg,
            Self::Report(e) => e.to_string(),
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

impl From<ReportError> for ApiError {
    fn from(e: ReportError) -> Self {
        Self::Report(e)
    }
}
