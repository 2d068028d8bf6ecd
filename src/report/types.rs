use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identifier of a Search Console property the signed-in account can read,
/// e.g. `https://example.com/` or `sc-domain:example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque OAuth bearer token attached to upstream requests.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Inclusive reporting window. `start_date <= end_date` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

/// Rejected date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl fmt::Display for InvalidDateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "start_date {} is after end_date {}",
            self.start_date, self.end_date
        )
    }
}

impl std::error::Error for InvalidDateRange {}

impl DateRange {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, InvalidDateRange> {
        if start_date > end_date {
            return Err(InvalidDateRange {
                start_date,
                end_date,
            });
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// The last 30 full days ending yesterday, relative to `today`.
    pub fn trailing_month(today: NaiveDate) -> Self {
        Self {
            start_date: today - chrono::Days::new(30),
            end_date: today - chrono::Days::new(1),
        }
    }

    pub const fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub const fn end_date(&self) -> NaiveDate {
        self.end_date
    }
}

/// One Search Console row. `keys` follows the requested dimension order:
/// query, page, device, country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default, deserialize_with = "non_negative_count")]
    pub clicks: u64,
    #[serde(default, deserialize_with = "non_negative_count")]
    pub impressions: u64,
    #[serde(default)]
    pub ctr: f64,
    #[serde(default)]
    pub position: f64,
}

impl ReportRow {
    /// The first dimension value (the query text).
    pub fn query(&self) -> Option<&str> {
        self.keys.first().map(String::as_str)
    }
}

/// Search Console reports counts as JSON numbers which may carry a fraction
/// (`3.0`). Accept both shapes and truncate toward zero.
fn non_negative_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Int(u64),
        Float(f64),
    }

    match Count::deserialize(deserializer)? {
        Count::Int(n) => Ok(n),
        Count::Float(f) if f.is_finite() && f >= 0.0 => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let n = f.trunc() as u64;
            Ok(n)
        }
        Count::Float(f) => Err(serde::de::Error::custom(format!(
            "expected a non-negative count, got {f}"
        ))),
    }
}

/// A single `{ "value": "..." }` cell of a GA4 report row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportValue {
    #[serde(default)]
    pub value: String,
}

/// One GA4 Data API row: dimensions `[source, medium]`, metrics
/// `[sessions, conversions, engagedSessions]`, all encoded as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficRow {
    #[serde(default)]
    pub dimension_values: Vec<ReportValue>,
    #[serde(default)]
    pub metric_values: Vec<ReportValue>,
}

impl TrafficRow {
    pub fn source(&self) -> Option<&str> {
        self.dimension_values.first().map(|v| v.value.as_str())
    }

    pub fn medium(&self) -> Option<&str> {
        self.dimension_values.get(1).map(|v| v.value.as_str())
    }

    /// Raw text of the metric at `index`, if the row has that many metrics.
    pub fn metric_text(&self, index: usize) -> Option<&str> {
        self.metric_values.get(index).map(|v| v.value.as_str())
    }
}
