use crate::aggregate::{Grouped, CHART_GROUP_LIMIT, TABLE_ROW_LIMIT, UNKNOWN_KEY};
use crate::report::types::ReportRow;
use serde::Serialize;

/// Running totals for one query.
///
/// `ctr_sum` is the plain sum of per-row CTRs, not a weighted mean. That is
/// how the dashboard has always reported it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuerySummary {
    pub query: String,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr_sum: f64,
    pub position_sum: f64,
    pub count: u64,
}

impl QuerySummary {
    pub fn mean_position(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = self.count as f64;
        self.position_sum / count
    }
}

#[derive(Default)]
struct Totals {
    clicks: u64,
    impressions: u64,
    ctr: f64,
    position: f64,
    count: u64,
}

/// Parallel arrays for the three search charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchChartData {
    pub labels: Vec<String>,
    pub clicks: Vec<u64>,
    pub impressions: Vec<u64>,
    pub mean_positions: Vec<f64>,
}

/// One line of the "Top Queries" table, taken straight from a raw row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryTableRow {
    pub query: String,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
    /// CTR as a percentage with two decimals, e.g. `"30.00%"`.
    pub ctr_display: String,
    /// Position with one decimal, e.g. `"2.0"`.
    pub position_display: String,
}

impl From<&ReportRow> for QueryTableRow {
    fn from(row: &ReportRow) -> Self {
        Self {
            query: row.query().unwrap_or(UNKNOWN_KEY).to_string(),
            clicks: row.clicks,
            impressions: row.impressions,
            ctr: row.ctr,
            position: row.position,
            ctr_display: format!("{:.2}%", row.ctr * 100.0),
            position_display: format!("{:.1}", row.position),
        }
    }
}

/// Everything the dashboard shows for the search dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchReport {
    pub groups: Vec<QuerySummary>,
    pub chart: SearchChartData,
    pub table: Vec<QueryTableRow>,
    pub total_rows: usize,
}

/// Group rows by their first key and sum the metrics of each group.
///
/// Returns every group in first-seen order.
pub fn group_by_query(rows: &[ReportRow]) -> Vec<QuerySummary> {
    let mut grouped: Grouped<Totals> = Grouped::new();
    for row in rows {
        let totals = grouped.entry(row.query().unwrap_or(UNKNOWN_KEY));
        totals.clicks = totals.clicks.saturating_add(row.clicks);
        totals.impressions = totals.impressions.saturating_add(row.impressions);
        totals.ctr += row.ctr;
        totals.position += row.position;
        totals.count += 1;
    }

    grouped
        .into_groups()
        .into_iter()
        .map(|(query, t)| QuerySummary {
            query,
            clicks: t.clicks,
            impressions: t.impressions,
            ctr_sum: t.ctr,
            position_sum: t.position,
            count: t.count,
        })
        .collect()
}

/// Build the chart and table data for a search report.
///
/// Returns `None` for an empty row list: there is nothing to draw and the
/// previous charts stay as they are.
pub fn summarize_search(rows: &[ReportRow]) -> Option<SearchReport> {
    if rows.is_empty() {
        return None;
    }

    let mut groups = group_by_query(rows);
    groups.truncate(CHART_GROUP_LIMIT);

    let chart = SearchChartData {
        labels: groups.iter().map(|g| g.query.clone()).collect(),
        clicks: groups.iter().map(|g| g.clicks).collect(),
        impressions: groups.iter().map(|g| g.impressions).collect(),
        mean_positions: groups.iter().map(QuerySummary::mean_position).collect(),
    };

    let table = rows
        .iter()
        .take(TABLE_ROW_LIMIT)
        .map(QueryTableRow::from)
        .collect();

    Some(SearchReport {
        groups,
        chart,
        table,
        total_rows: rows.len(),
    })
}
