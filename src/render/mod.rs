//! Chart specifications and the surface → chart registry.
//!
//! Drawing happens in the browser. The server decides what each display
//! surface shows and guarantees that a surface is bound to at most one live
//! chart: the previous handle is disposed before a new one is bound.

use crate::aggregate::search::SearchReport;
use crate::aggregate::traffic::TrafficReport;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// The six chart canvases on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Surface {
    #[serde(rename = "clicksChart")]
    Clicks,
    #[serde(rename = "impressionsChart")]
    Impressions,
    #[serde(rename = "positionsChart")]
    Positions,
    #[serde(rename = "sessionsChart")]
    Sessions,
    #[serde(rename = "conversionsChart")]
    Conversions,
    #[serde(rename = "engagementChart")]
    Engagement,
}

impl Surface {
    pub const ALL: [Self; 6] = [
        Self::Clicks,
        Self::Impressions,
        Self::Positions,
        Self::Sessions,
        Self::Conversions,
        Self::Engagement,
    ];

    /// DOM element id of the canvas.
    pub const fn element_id(self) -> &'static str {
        match self {
            Self::Clicks => "clicksChart",
            Self::Impressions => "impressionsChart",
            Self::Positions => "positionsChart",
            Self::Sessions => "sessionsChart",
            Self::Conversions => "conversionsChart",
            Self::Engagement => "engagementChart",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::Clicks => "Top Queries by Clicks",
            Self::Impressions => "Top Queries by Impressions",
            Self::Positions => "Average Position by Query",
            Self::Sessions => "Sessions by Source",
            Self::Conversions => "Conversions by Source",
            Self::Engagement => "Engaged Sessions by Source",
        }
    }

    pub const fn color(self) -> Rgba {
        match self {
            Self::Clicks => Rgba::new(54, 162, 235, 0.6),
            Self::Impressions => Rgba::new(255, 206, 86, 0.6),
            Self::Positions => Rgba::new(75, 192, 192, 0.6),
            Self::Sessions => Rgba::new(153, 102, 255, 0.6),
            Self::Conversions => Rgba::new(255, 159, 64, 0.6),
            Self::Engagement => Rgba::new(255, 99, 132, 0.6),
        }
    }
}

/// CSS `rgba()` color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Same color, fully opaque. Used for bar borders.
    pub const fn opaque(self) -> Self {
        Self { a: 1.0, ..self }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

impl Serialize for Rgba {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
}

/// What to draw on one surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub surface: Surface,
    pub title: String,
    pub kind: ChartKind,
    pub color: Rgba,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ChartSpec {
    /// Bar chart with the surface's standard title and color.
    pub fn bar(surface: Surface, labels: Vec<String>, values: Vec<f64>) -> Self {
        Self {
            surface,
            title: surface.title().to_string(),
            kind: ChartKind::Bar,
            color: surface.color(),
            labels,
            values,
        }
    }

    /// Chart.js-compatible configuration object.
    pub fn to_config(&self) -> serde_json::Value {
        serde_json::json!({
            "type": self.kind,
            "data": {
                "labels": self.labels,
                "datasets": [{
                    "label": self.title,
                    "data": self.values,
                    "backgroundColor": self.color,
                    "borderColor": self.color.opaque(),
                    "borderWidth": 1,
                }],
            },
            "options": {
                "responsive": true,
                "maintainAspectRatio": false,
                "plugins": {
                    "title": { "display": true, "text": self.title },
                    "legend": { "display": false },
                },
                "scales": { "y": { "beginAtZero": true } },
            },
        })
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_values(counts: &[u64]) -> Vec<f64> {
    counts.iter().map(|&n| n as f64).collect()
}

/// Clicks, impressions and mean position charts for a search report.
pub fn search_charts(report: &SearchReport) -> [ChartSpec; 3] {
    let labels = &report.chart.labels;
    [
        ChartSpec::bar(Surface::Clicks, labels.clone(), as_values(&report.chart.clicks)),
        ChartSpec::bar(
            Surface::Impressions,
            labels.clone(),
            as_values(&report.chart.impressions),
        ),
        ChartSpec::bar(
            Surface::Positions,
            labels.clone(),
            report.chart.mean_positions.clone(),
        ),
    ]
}

/// Sessions, conversions and engaged-sessions charts for a traffic report.
pub fn traffic_charts(report: &TrafficReport) -> [ChartSpec; 3] {
    let labels = &report.chart.labels;
    [
        ChartSpec::bar(
            Surface::Sessions,
            labels.clone(),
            as_values(&report.chart.sessions),
        ),
        ChartSpec::bar(
            Surface::Conversions,
            labels.clone(),
            as_values(&report.chart.conversions),
        ),
        ChartSpec::bar(
            Surface::Engagement,
            labels.clone(),
            as_values(&report.chart.engaged_sessions),
        ),
    ]
}

/// A chart bound to a surface. Ids are never reused within a registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartHandle {
    pub id: u64,
    pub spec: ChartSpec,
}

/// Surface → current chart.
#[derive(Debug, Default)]
pub struct ChartRegistry {
    charts: BTreeMap<Surface, ChartHandle>,
    next_id: u64,
    disposed_total: u64,
}

impl ChartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispose whatever is bound to `spec.surface`, then bind a new chart.
    ///
    /// Returns the id of the disposed handle, if there was one.
    pub fn render(&mut self, spec: ChartSpec) -> Option<u64> {
        let surface = spec.surface;
        let disposed = self.dispose(surface);

        self.next_id += 1;
        let id = self.next_id;
        tracing::debug!(surface = surface.element_id(), id, "Chart rendered");
        self.charts.insert(surface, ChartHandle { id, spec });
        disposed
    }

    /// Release the chart bound to `surface`.
    pub fn dispose(&mut self, surface: Surface) -> Option<u64> {
        let old = self.charts.remove(&surface)?;
        self.disposed_total += 1;
        tracing::debug!(surface = surface.element_id(), id = old.id, "Chart disposed");
        Some(old.id)
    }

    pub fn get(&self, surface: Surface) -> Option<&ChartHandle> {
        self.charts.get(&surface)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChartHandle> {
        self.charts.values()
    }

    /// Number of live charts.
    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    /// Charts disposed since startup.
    pub const fn disposed_total(&self) -> u64 {
        self.disposed_total
    }
}
