use crate::aggregate::{Grouped, CHART_GROUP_LIMIT, UNKNOWN_KEY};
use crate::report::types::TrafficRow;
use serde::Serialize;

const SESSIONS: usize = 0;
const CONVERSIONS: usize = 1;
const ENGAGED_SESSIONS: usize = 2;

/// Summed traffic metrics for one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub source: String,
    pub sessions: u64,
    pub conversions: u64,
    pub engaged_sessions: u64,
}

#[derive(Default)]
struct Totals {
    sessions: u64,
    conversions: u64,
    engaged_sessions: u64,
}

/// Parallel arrays for the three traffic charts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrafficChartData {
    pub labels: Vec<String>,
    pub sessions: Vec<u64>,
    pub conversions: Vec<u64>,
    pub engaged_sessions: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrafficReport {
    pub groups: Vec<SourceSummary>,
    pub chart: TrafficChartData,
    pub total_rows: usize,
}

/// Parse a text-encoded GA4 metric the way a lenient integer parser would:
/// leading whitespace and an optional `+` are skipped, then the leading run of
/// digits is read (`"12.7"` is 12). Anything else counts as 0.
pub fn parse_metric(text: &str) -> u64 {
    let trimmed = text.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits_end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    let digits = &unsigned[..digits_end];

    match digits.parse::<u64>() {
        Ok(n) => n,
        Err(_) if digits.is_empty() => {
            tracing::warn!(value = text, "Non-numeric traffic metric, counting as 0");
            0
        }
        Err(_) => {
            tracing::warn!(value = text, "Traffic metric out of range, saturating");
            u64::MAX
        }
    }
}

fn metric(row: &TrafficRow, index: usize) -> u64 {
    row.metric_text(index).map_or(0, parse_metric)
}

/// Group rows by source and sum their metrics, in first-seen order.
pub fn group_by_source(rows: &[TrafficRow]) -> Vec<SourceSummary> {
    let mut grouped: Grouped<Totals> = Grouped::new();
    for row in rows {
        let totals = grouped.entry(row.source().unwrap_or(UNKNOWN_KEY));
        totals.sessions = totals.sessions.saturating_add(metric(row, SESSIONS));
        totals.conversions = totals.conversions.saturating_add(metric(row, CONVERSIONS));
        totals.engaged_sessions = totals
            .engaged_sessions
            .saturating_add(metric(row, ENGAGED_SESSIONS));
    }

    grouped
        .into_groups()
        .into_iter()
        .map(|(source, t)| SourceSummary {
            source,
            sessions: t.sessions,
            conversions: t.conversions,
            engaged_sessions: t.engaged_sessions,
        })
        .collect()
}

/// Build the chart data for a traffic report. `None` for an empty row list.
pub fn summarize_traffic(rows: &[TrafficRow]) -> Option<TrafficReport> {
    if rows.is_empty() {
        return None;
    }

    let mut groups = group_by_source(rows);
    groups.truncate(CHART_GROUP_LIMIT);

    let chart = TrafficChartData {
        labels: groups.iter().map(|g| g.source.clone()).collect(),
        sessions: groups.iter().map(|g| g.sessions).collect(),
        conversions: groups.iter().map(|g| g.conversions).collect(),
        engaged_sessions: groups.iter().map(|g| g.engaged_sessions).collect(),
    };

    Some(TrafficReport {
        groups,
        chart,
        total_rows: rows.len(),
    })
}
