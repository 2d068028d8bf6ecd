//! Google Search Console and GA4 Data API client.

use crate::config::Config;
use crate::report::error::UpstreamError;
use crate::report::types::{AccessToken, DateRange, ReportRow, TargetId, TrafficRow};
use crate::report::{
    ReportSource, SEARCH_DIMENSIONS, SEARCH_ROW_LIMIT, TRAFFIC_DIMENSIONS, TRAFFIC_METRICS,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Build the shared HTTP client used for every Google call.
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder().user_agent(format!(
        "{}/{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    ));
    if config.upstream_timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(config.upstream_timeout_secs));
    }
    builder.build()
}

/// [`ReportSource`] backed by the live Google APIs.
#[derive(Debug, Clone)]
pub struct GoogleReportClient {
    http: Client,
    search_base: Url,
    analytics_base: Url,
    api_key: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SiteList {
    #[serde(default)]
    site_entry: Vec<SiteEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SiteEntry {
    site_url: String,
}

#[derive(Deserialize)]
struct Rows<T> {
    #[serde(default = "Vec::new")]
    rows: Vec<T>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl GoogleReportClient {
    pub fn new(config: &Config, http: Client) -> Result<Self, UpstreamError> {
        Ok(Self {
            http,
            search_base: parse_base(&config.search_api_base)?,
            analytics_base: parse_base(&config.analytics_api_base)?,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    fn endpoint<'a>(
        base: &Url,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, UpstreamError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| UpstreamError::InvalidUrl(base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder, token: &AccessToken) -> RequestBuilder {
        let request = request.bearer_auth(token.secret());
        match &self.api_key {
            Some(key) => request.query(&[("key", key)]),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, UpstreamError> {
        let response = request.send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }
}

fn parse_base(raw: &str) -> Result<Url, UpstreamError> {
    let url = Url::parse(raw).map_err(|e| UpstreamError::InvalidUrl(format!("{raw}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(UpstreamError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

/// Turn a non-success response into [`UpstreamError::Status`], preferring the
/// message from Google's `{"error": {"message": ...}}` envelope.
async fn check_status(response: Response) -> Result<Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .ok()
        .map(|e| e.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    Err(UpstreamError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ReportSource for GoogleReportClient {
    async fn list_targets(&self, token: &AccessToken) -> Result<Vec<TargetId>, UpstreamError> {
        let url = Self::endpoint(&self.search_base, ["sites"])?;
        let request = self.authorize(self.http.get(url), token);
        let list: SiteList = Self::send(request).await?;
        Ok(list
            .site_entry
            .into_iter()
            .map(|s| TargetId::new(s.site_url))
            .collect())
    }

    async fn fetch_search_report(
        &self,
        token: &AccessToken,
        target: &TargetId,
        range: &DateRange,
    ) -> Result<Vec<ReportRow>, UpstreamError> {
        let url = Self::endpoint(
            &self.search_base,
            ["sites", target.as_str(), "searchAnalytics", "query"],
        )?;
        let body = serde_json::json!({
            "startDate": range.start_date().to_string(),
            "endDate": range.end_date().to_string(),
            "dimensions": SEARCH_DIMENSIONS,
            "rowLimit": SEARCH_ROW_LIMIT,
        });
        tracing::debug!(site = %target, "Requesting search analytics");
        let request = self.authorize(self.http.post(url).json(&body), token);
        let rows: Rows<ReportRow> = Self::send(request).await?;
        Ok(rows.rows)
    }

    async fn fetch_traffic_report(
        &self,
        token: &AccessToken,
        property: &str,
        range: &DateRange,
    ) -> Result<Vec<TrafficRow>, UpstreamError> {
        let method = format!("{property}:runReport");
        let url = Self::endpoint(&self.analytics_base, ["properties", method.as_str()])?;
        let body = serde_json::json!({
            "dateRanges": [{
                "startDate": range.start_date().to_string(),
                "endDate": range.end_date().to_string(),
            }],
            "dimensions": TRAFFIC_DIMENSIONS.map(|name| serde_json::json!({ "name": name })),
            "metrics": TRAFFIC_METRICS.map(|name| serde_json::json!({ "name": name })),
        });
        tracing::debug!(property, "Requesting traffic report");
        let request = self.authorize(self.http.post(url).json(&body), token);
        let rows: Rows<TrafficRow> = Self::send(request).await?;
        Ok(rows.rows)
    }
}
