pub mod error;
pub mod generate;
pub mod google;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

use crate::report::error::UpstreamError;
use crate::report::types::{AccessToken, DateRange, ReportRow, TargetId, TrafficRow};
use async_trait::async_trait;

/// Maximum rows requested from Search Console per report.
pub const SEARCH_ROW_LIMIT: u32 = 500;

/// Search Console dimensions, in the order they appear in `ReportRow::keys`.
pub const SEARCH_DIMENSIONS: [&str; 4] = ["query", "page", "device", "country"];

pub const TRAFFIC_DIMENSIONS: [&str; 2] = ["source", "medium"];

/// GA4 metrics, in the order they appear in `TrafficRow::metric_values`.
pub const TRAFFIC_METRICS: [&str; 3] = ["sessions", "conversions", "engagedSessions"];

/// The reporting backends the dashboard reads from.
///
/// Each call is independent: a failure never affects another call and none is
/// retried.
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Sites the signed-in account can read, in the order the API returns them.
    async fn list_targets(&self, token: &AccessToken) -> Result<Vec<TargetId>, UpstreamError>;

    /// Search performance rows for `target`, capped at [`SEARCH_ROW_LIMIT`].
    async fn fetch_search_report(
        &self,
        token: &AccessToken,
        target: &TargetId,
        range: &DateRange,
    ) -> Result<Vec<ReportRow>, UpstreamError>;

    /// Traffic-source rows for a GA4 property.
    async fn fetch_traffic_report(
        &self,
        token: &AccessToken,
        property: &str,
        range: &DateRange,
    ) -> Result<Vec<TrafficRow>, UpstreamError>;
}
