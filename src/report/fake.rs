//! Scripted [`ReportSource`] for unit tests.

use crate::report::error::UpstreamError;
use crate::report::types::{AccessToken, DateRange, ReportRow, TargetId, TrafficRow};
use crate::report::ReportSource;
use async_trait::async_trait;
use parking_lot::Mutex;

pub struct FakeSource {
    pub targets: Mutex<Result<Vec<TargetId>, String>>,
    pub search: Mutex<Result<Vec<ReportRow>, String>>,
    pub traffic: Mutex<Result<Vec<TrafficRow>, String>>,
    pub calls: Mutex<Vec<String>>,
}

fn failure(message: &str) -> UpstreamError {
    UpstreamError::Status {
        status: 500,
        message: message.to_string(),
    }
}

impl FakeSource {
    pub fn with_rows(search: Vec<ReportRow>, traffic: Vec<TrafficRow>) -> Self {
        Self {
            targets: Mutex::new(Ok(vec![TargetId::new("https://example.com/")])),
            search: Mutex::new(Ok(search)),
            traffic: Mutex::new(Ok(traffic)),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ReportSource for FakeSource {
    async fn list_targets(&self, _token: &AccessToken) -> Result<Vec<TargetId>, UpstreamError> {
        self.calls.lock().push("list_targets".to_string());
        self.targets.lock().clone().map_err(|m| failure(&m))
    }

    async fn fetch_search_report(
        &self,
        _token: &AccessToken,
        target: &TargetId,
        _range: &DateRange,
    ) -> Result<Vec<ReportRow>, UpstreamError> {
        self.calls.lock().push(format!("search:{target}"));
        self.search.lock().clone().map_err(|m| failure(&m))
    }

    async fn fetch_traffic_report(
        &self,
        _token: &AccessToken,
        property: &str,
        _range: &DateRange,
    ) -> Result<Vec<TrafficRow>, UpstreamError> {
        self.calls.lock().push(format!("traffic:{property}"));
        self.traffic.lock().clone().map_err(|m| failure(&m))
    }
}

pub fn search_row(query: &str, clicks: u64, impressions: u64, ctr: f64, position: f64) -> ReportRow {
    ReportRow {
        keys: vec![query.to_string()],
        clicks,
        impressions,
        ctr,
        position,
    }
}

pub fn traffic_row(source: &str, sessions: &str, conversions: &str, engaged: &str) -> TrafficRow {
    use crate::report::types::ReportValue;
    let value = |v: &str| ReportValue {
        value: v.to_string(),
    };
    TrafficRow {
        dimension_values: vec![value(source), value("organic")],
        metric_values: vec![value(sessions), value(conversions), value(engaged)],
    }
}
