use crate::report::generate::{generate_report, GenerateOutcome};
use crate::state::{AppState, LatestViews};
use axum::extract::State;
use axum::Json;
use serde_json::{Map, Value};
use std::sync::Arc;

/// POST /api/report — Fetch both datasets and rebuild the charts.
///
/// Always 200: per-dataset failures are part of the outcome, and a signed-out
/// session or missing target yields `{"outcome": "skipped"}`. A failed
/// initialization is attempted again first.
pub async fn post_report(State(state): State<Arc<AppState>>) -> Json<GenerateOutcome> {
    state.retry_failed_init();
    Json(generate_report(&state).await)
}

/// GET /api/report — Latest aggregated search and traffic views.
pub async fn get_report(State(state): State<Arc<AppState>>) -> Json<LatestViews> {
    Json(state.views.lock().clone())
}

/// GET /api/charts — Live charts keyed by canvas id.
pub async fn get_charts(State(state): State<Arc<AppState>>) -> Json<Value> {
    let charts = state.charts.lock();
    let body: Map<String, Value> = charts
        .iter()
        .map(|handle| {
            (
                handle.spec.surface.element_id().to_string(),
                serde_json::json!({
                    "id": handle.id,
                    "config": handle.spec.to_config(),
                }),
            )
        })
        .collect();
    Json(Value::Object(body))
}
