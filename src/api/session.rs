use crate::api::errors::ApiError;
use crate::report::types::DateRange;
use crate::session::init::InitState;
use crate::session::SessionSnapshot;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Everything the dashboard needs to draw its controls and banners.
#[derive(Debug, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: SessionSnapshot,
    pub init: InitState,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TargetRequest {
    pub target: String,
}

#[derive(Debug, Deserialize)]
pub struct RangeRequest {
    pub start_date: String,
    pub end_date: String,
}

impl RangeRequest {
    /// Parse both `YYYY-MM-DD` dates and check their order.
    pub fn to_range(&self) -> Result<DateRange, ApiError> {
        let start = parse_date("start_date", &self.start_date)?;
        let end = parse_date("end_date", &self.end_date)?;
        DateRange::new(start, end).map_err(|e| ApiError::BadRequest(e.to_string()))
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("{field} must be a YYYY-MM-DD date, got '{value}'")))
}

/// GET /api/session
pub async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionView> {
    Json(SessionView {
        session: state.session.snapshot(),
        init: state.init_state(),
        loading: state.is_loading(),
        error: state.errors.current(),
    })
}

/// PUT /api/session/target — Select a site. An empty string clears the selection.
pub async fn set_target(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TargetRequest>,
) -> StatusCode {
    state.session.set_target(body.target.trim());
    StatusCode::NO_CONTENT
}

/// PUT /api/session/range
pub async fn set_range(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RangeRequest>,
) -> Result<StatusCode, ApiError> {
    let range = body.to_range()?;
    state.session.set_date_range(range);
    Ok(StatusCode::NO_CONTENT)
}
