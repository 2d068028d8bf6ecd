use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use seo_dashboard::config::Config;
use seo_dashboard::server::build_router;
use seo_dashboard::session::init::spawn_signin_listener;
use seo_dashboard::state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn make_test_state(server: &MockServer) -> Arc<AppState> {
    let config = Config {
        client_id: "dashboard-test.apps.googleusercontent.com".to_string(),
        client_secret: Some("test-secret".to_string()),
        analytics_property_id: Some("293549621".to_string()),
        search_api_base: format!("{}/webmasters/v3", server.uri()),
        analytics_api_base: format!("{}/v1beta", server.uri()),
        oauth_token_url: format!("{}/token", server.uri()),
        ..Config::default()
    };
    let state = Arc::new(AppState::new(config));
    assert!(state.initialize());
    spawn_signin_listener(Arc::clone(&state));
    state
}

async fn mount_google(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.integration",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/webmasters/v3/sites"))
        .and(header("authorization", "Bearer ya29.integration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "siteEntry": [
                {"siteUrl": "https://integration-test.com/", "permissionLevel": "siteOwner"},
                {"siteUrl": "sc-domain:other.com", "permissionLevel": "siteFullUser"}
            ]
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/webmasters/v3/sites/.+/searchAnalytics/query$"))
        .and(body_partial_json(serde_json::json!({
            "startDate": "2024-04-01",
            "endDate": "2024-04-30",
            "rowLimit": 500
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "rows": [
                {"keys": ["rust web framework", "https://integration-test.com/", "DESKTOP", "usa"],
                 "clicks": 12, "impressions": 200, "ctr": 0.06, "position": 3.0},
                {"keys": ["axum tutorial", "https://integration-test.com/axum", "MOBILE", "gbr"],
                 "clicks": 4, "impressions": 50, "ctr": 0.08, "position": 6.5},
                {"keys": ["rust web framework", "https://integration-test.com/", "MOBILE", "usa"],
                 "clicks": 8, "impressions": 100, "ctr": 0.08, "position": 5.0}
            ],
            "responseAggregationType": "byPage"
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1beta/properties/293549621:runReport"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "rows": [
                {"dimensionValues": [{"value": "google"}, {"value": "organic"}],
                 "metricValues": [{"value": "120"}, {"value": "4"}, {"value": "90"}]},
                {"dimensionValues": [{"value": "(direct)"}, {"value": "(none)"}],
                 "metricValues": [{"value": "30"}, {"value": "1"}, {"value": "12"}]},
                {"dimensionValues": [{"value": "google"}, {"value": "cpc"}],
                 "metricValues": [{"value": "15"}, {"value": "2"}, {"value": "9"}]}
            ],
            "rowCount": 3
        })))
        .mount(server)
        .await;
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

async fn wait_for_targets(state: &AppState) {
    for _ in 0..200 {
        if state.session.selected_target().is_some() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("site list was never loaded");
}

/// Extract the `state` parameter from the consent-screen redirect.
fn login_state(location: &str) -> String {
    let url = reqwest::Url::parse(location).unwrap();
    url.query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap()
}

#[tokio::test]
async fn test_full_report_pipeline() {
    let server = MockServer::start().await;
    mount_google(&server).await;
    let state = make_test_state(&server);
    let app = build_router(Arc::clone(&state));

    // Sign in through the OAuth round trip
    let (status, headers, _) = send(&app, get("/api/auth/login")).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    let location = headers.get("location").unwrap().to_str().unwrap();
    let login = login_state(location);

    let (status, headers, _) = send(
        &app,
        get(&format!("/api/auth/callback?code=auth-code&state={login}")),
    )
    .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers.get("location").unwrap(), "/");
    assert!(state.session.is_authenticated());

    // The sign-in listener loads the site list and selects the first entry
    wait_for_targets(&state).await;
    let (_, _, body) = send(&app, get("/api/session")).await;
    let session: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(session["authenticated"], true);
    assert_eq!(session["selected_target"], "https://integration-test.com/");
    assert_eq!(session["targets"].as_array().unwrap().len(), 2);

    let (status, _, _) = send(
        &app,
        json(
            "PUT",
            "/api/session/range",
            &serde_json::json!({ "start_date": "2024-04-01", "end_date": "2024-04-30" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Generate the report
    let request = Request::builder()
        .method("POST")
        .uri("/api/report")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let outcome: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(outcome["outcome"], "completed");
    assert_eq!(outcome["search"]["status"], "rendered");
    assert_eq!(outcome["search"]["groups"], 2);
    assert_eq!(outcome["search"]["rows"], 3);
    assert_eq!(outcome["traffic"]["status"], "rendered");
    assert_eq!(outcome["traffic"]["groups"], 2);

    // Aggregated views
    let (_, _, body) = send(&app, get("/api/report")).await;
    let report: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        report["search"]["chart"]["labels"],
        serde_json::json!(["rust web framework", "axum tutorial"])
    );
    assert_eq!(report["search"]["chart"]["clicks"], serde_json::json!([20, 4]));
    assert_eq!(
        report["search"]["chart"]["mean_positions"],
        serde_json::json!([4.0, 6.5])
    );
    assert_eq!(report["search"]["table"].as_array().unwrap().len(), 3);
    assert_eq!(report["search"]["table"][1]["ctr_display"], "8.00%");
    assert_eq!(report["search"]["table"][1]["position_display"], "6.5");
    assert_eq!(
        report["traffic"]["chart"]["labels"],
        serde_json::json!(["google", "(direct)"])
    );
    assert_eq!(report["traffic"]["chart"]["sessions"], serde_json::json!([135, 30]));
    assert_eq!(
        report["traffic"]["chart"]["engaged_sessions"],
        serde_json::json!([99, 12])
    );

    // Charts
    let (_, _, body) = send(&app, get("/api/charts")).await;
    let charts: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(charts.as_object().unwrap().len(), 6);
    let first_ids: Vec<u64> = charts
        .as_object()
        .unwrap()
        .values()
        .map(|c| c["id"].as_u64().unwrap())
        .collect();
    assert_eq!(
        charts["sessionsChart"]["config"]["data"]["datasets"][0]["label"],
        "Sessions by Source"
    );

    // Regenerating replaces every chart
    let request = Request::builder()
        .method("POST")
        .uri("/api/report")
        .body(Body::empty())
        .unwrap();
    send(&app, request).await;
    let (_, _, body) = send(&app, get("/api/charts")).await;
    let charts: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(charts.as_object().unwrap().len(), 6);
    for chart in charts.as_object().unwrap().values() {
        assert!(!first_ids.contains(&chart["id"].as_u64().unwrap()));
    }

    let (_, _, body) = send(&app, get("/metrics")).await;
    let metrics = String::from_utf8(body).unwrap();
    assert!(metrics.contains("seo_dashboard_reports_generated_total 2"));
    assert!(metrics.contains("seo_dashboard_charts_disposed_total 6"));
    assert!(metrics.contains("seo_dashboard_fetch_failures_total 0"));
}

#[tokio::test]
async fn test_analytics_failure_keeps_search_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/webmasters/v3/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/webmasters/v3/sites/.+/searchAnalytics/query$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "rows": [
                {"keys": ["cat"], "clicks": 3, "impressions": 10, "ctr": 0.3, "position": 2.0}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/properties/293549621:runReport"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": {
                "code": 403,
                "message": "User does not have sufficient permissions for this property.",
                "status": "PERMISSION_DENIED"
            }
        })))
        .mount(&server)
        .await;

    let state = make_test_state(&server);
    let app = build_router(Arc::clone(&state));

    let (status, _, _) = send(
        &app,
        json(
            "POST",
            "/api/auth/token",
            &serde_json::json!({ "access_token": "ya29.direct" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    send(
        &app,
        json(
            "PUT",
            "/api/session/target",
            &serde_json::json!({ "target": "sc-domain:integration-test.com" }),
        ),
    )
    .await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/report")
        .body(Body::empty())
        .unwrap();
    let (_, _, body) = send(&app, request).await;
    let outcome: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(outcome["search"]["status"], "rendered");
    assert_eq!(outcome["traffic"]["status"], "failed");
    assert_eq!(
        outcome["traffic"]["message"],
        "Error fetching Analytics data: User does not have sufficient permissions for this property. (HTTP 403)"
    );

    let (_, _, body) = send(&app, get("/api/charts")).await;
    let charts: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(charts.get("clicksChart").is_some());
    assert!(charts.get("sessionsChart").is_none());

    let (_, _, body) = send(&app, get("/api/session")).await;
    let session: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        session["error"],
        "Error fetching Analytics data: User does not have sufficient permissions for this property. (HTTP 403)"
    );
}

#[tokio::test]
async fn test_signed_out_report_is_skipped() {
    let server = MockServer::start().await;
    let state = make_test_state(&server);
    let app = build_router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/api/report")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let outcome: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(outcome["outcome"], "skipped");
    assert!(server.received_requests().await.unwrap().is_empty());
}
