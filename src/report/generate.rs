//! One report generation: fetch both datasets, aggregate, replace the charts.

use crate::aggregate::search::summarize_search;
use crate::aggregate::traffic::summarize_traffic;
use crate::render::{search_charts, traffic_charts, ChartSpec};
use crate::report::error::ReportError;
use crate::report::ReportSource;
use crate::session::ReportRequest;
use crate::state::AppState;
use serde::Serialize;
use std::sync::atomic::Ordering;

/// What happened to one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DatasetOutcome {
    Rendered { groups: usize, rows: usize },
    /// The upstream returned no rows. Charts and tables are left as they were.
    Empty,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateSummary {
    pub search: DatasetOutcome,
    pub traffic: DatasetOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GenerateOutcome {
    /// Signed out, no target selected, or clients not initialized.
    Skipped,
    Completed(GenerateSummary),
}

/// Fetch and render both datasets for the current session.
///
/// The two fetches run concurrently and each dataset is rendered as soon as
/// its own fetch resolves, so one failing never holds back the other.
pub async fn generate_report(state: &AppState) -> GenerateOutcome {
    let Some(request) = state.session.report_request() else {
        tracing::debug!("Report skipped: not signed in or no target selected");
        return GenerateOutcome::Skipped;
    };
    let Some(source) = state.source() else {
        tracing::debug!("Report skipped: clients not initialized");
        return GenerateOutcome::Skipped;
    };

    let _loading = state.loading_guard();
    let (search, traffic) = tokio::join!(
        search_dataset(state, source.as_ref(), &request),
        traffic_dataset(state, source.as_ref(), &request),
    );
    state.reports_generated_total.fetch_add(1, Ordering::Relaxed);

    tracing::info!(
        site = %request.target,
        start = %request.range.start_date(),
        end = %request.range.end_date(),
        ?search,
        ?traffic,
        "Report generated"
    );
    GenerateOutcome::Completed(GenerateSummary { search, traffic })
}

async fn search_dataset(
    state: &AppState,
    source: &dyn ReportSource,
    request: &ReportRequest,
) -> DatasetOutcome {
    let rows = match source
        .fetch_search_report(&request.token, &request.target, &request.range)
        .await
    {
        Ok(rows) => rows,
        Err(e) => return failed(state, &ReportError::SearchFetch(e.to_string())),
    };

    let Some(report) = summarize_search(&rows) else {
        return DatasetOutcome::Empty;
    };
    let outcome = DatasetOutcome::Rendered {
        groups: report.groups.len(),
        rows: report.total_rows,
    };
    render_all(state, search_charts(&report));
    state.views.lock().search = Some(report);
    outcome
}

async fn traffic_dataset(
    state: &AppState,
    source: &dyn ReportSource,
    request: &ReportRequest,
) -> DatasetOutcome {
    let Some(property) = state.config.analytics_property_for(request.target.as_str()) else {
        return failed(
            state,
            &ReportError::TrafficFetch(format!(
                "no GA4 property configured for {}",
                request.target
            )),
        );
    };

    let rows = match source
        .fetch_traffic_report(&request.token, property, &request.range)
        .await
    {
        Ok(rows) => rows,
        Err(e) => return failed(state, &ReportError::TrafficFetch(e.to_string())),
    };

    let Some(report) = summarize_traffic(&rows) else {
        return DatasetOutcome::Empty;
    };
    let outcome = DatasetOutcome::Rendered {
        groups: report.groups.len(),
        rows: report.total_rows,
    };
    render_all(state, traffic_charts(&report));
    state.views.lock().traffic = Some(report);
    outcome
}

fn render_all(state: &AppState, specs: [ChartSpec; 3]) {
    let mut charts = state.charts.lock();
    for spec in specs {
        charts.render(spec);
    }
}

fn failed(state: &AppState, error: &ReportError) -> DatasetOutcome {
    state.fetch_failures_total.fetch_add(1, Ordering::Relaxed);
    state.record_error(error);
    DatasetOutcome::Failed {
        message: error.to_string(),
    }
}
