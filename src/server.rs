use crate::api::{auth, reports, session};
use crate::dashboard;
use crate::state::AppState;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = build_dashboard_cors(state.config.dashboard_origin.as_deref());

    // Auth routes: the OAuth round trip plus direct token sign-in
    let auth_routes = Router::new()
        .route("/auth/login", get(auth::login))
        .route("/auth/callback", get(auth::callback))
        .route("/auth/token", post(auth::sign_in_with_token))
        .route("/auth/logout", post(auth::logout));

    let session_routes = Router::new()
        .route("/session", get(session::get_session))
        .route("/session/target", put(session::set_target))
        .route("/session/range", put(session::set_range));

    let report_routes = Router::new()
        .route(
            "/report",
            get(reports::get_report).post(reports::post_report),
        )
        .route("/charts", get(reports::get_charts));

    let api_routes = Router::new()
        .merge(auth_routes)
        .merge(session_routes)
        .merge(report_routes)
        .layer(cors);

    Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(detailed_health_check))
        .route("/metrics", get(prometheus_metrics))
        .nest("/api", api_routes)
        .route("/", get(dashboard::serve_index))
        .route("/{*path}", get(dashboard::serve_asset))
        .layer(axum::middleware::map_response(add_security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Inject OWASP-recommended security headers on every HTTP response.
async fn add_security_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    // Content-Security-Policy only on HTML responses (avoids breaking JSON APIs)
    let is_html = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("text/html"));
    if is_html {
        headers.insert(
            "content-security-policy",
            HeaderValue::from_static("default-src 'self'; script-src 'self'; style-src 'self'"),
        );
    }
    response
}

/// Build CORS layer for API routes based on configured origin.
fn build_dashboard_cors(dashboard_origin: Option<&str>) -> CorsLayer {
    dashboard_origin.map_or_else(
        || {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        },
        |origin| {
            let allowed_origin = origin
                .parse::<HeaderValue>()
                .unwrap_or_else(|_| HeaderValue::from_static("*"));
            CorsLayer::new()
                .allow_origin(allowed_origin)
                .allow_methods([Method::GET, Method::POST, Method::PUT])
                .allow_headers([header::CONTENT_TYPE])
                .allow_credentials(true)
        },
    )
}

/// GET /health — Simple health check endpoint.
async fn health_check() -> &'static str {
    "ok"
}

/// GET /health/detailed — Initialization, session and chart state.
async fn detailed_health_check(
    State(state): State<Arc<AppState>>,
) -> axum::Json<serde_json::Value> {
    let live_charts = state.charts.lock().len();

    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "init": state.init_state(),
        "authenticated": state.session.is_authenticated(),
        "target_selected": state.session.selected_target().is_some(),
        "loading": state.is_loading(),
        "live_charts": live_charts,
        "oauth_configured": !state.config.client_id.is_empty(),
    }))
}

/// GET /metrics — Prometheus-compatible metrics endpoint.
async fn prometheus_metrics(
    State(state): State<Arc<AppState>>,
) -> ([(header::HeaderName, &'static str); 1], String) {
    use std::fmt::Write;
    use std::sync::atomic::Ordering;

    let (live_charts, disposed) = {
        let charts = state.charts.lock();
        (charts.len(), charts.disposed_total())
    };
    let authenticated = u8::from(state.session.is_authenticated());
    let initialized = u8::from(state.init_state().is_ready());
    let loading = u8::from(state.is_loading());
    let reports = state.reports_generated_total.load(Ordering::Relaxed);
    let failures = state.fetch_failures_total.load(Ordering::Relaxed);

    let mut out = String::with_capacity(1024);
    let _ = writeln!(
        out,
        "# HELP seo_dashboard_initialized Whether the reporting clients are ready"
    );
    let _ = writeln!(out, "# TYPE seo_dashboard_initialized gauge");
    let _ = writeln!(out, "seo_dashboard_initialized {initialized}");
    let _ = writeln!(
        out,
        "# HELP seo_dashboard_authenticated Whether a user is signed in"
    );
    let _ = writeln!(out, "# TYPE seo_dashboard_authenticated gauge");
    let _ = writeln!(out, "seo_dashboard_authenticated {authenticated}");
    let _ = writeln!(
        out,
        "# HELP seo_dashboard_loading Whether an upstream fetch is in flight"
    );
    let _ = writeln!(out, "# TYPE seo_dashboard_loading gauge");
    let _ = writeln!(out, "seo_dashboard_loading {loading}");
    let _ = writeln!(out, "# HELP seo_dashboard_live_charts Charts currently bound");
    let _ = writeln!(out, "# TYPE seo_dashboard_live_charts gauge");
    let _ = writeln!(out, "seo_dashboard_live_charts {live_charts}");
    let _ = writeln!(
        out,
        "# HELP seo_dashboard_charts_disposed_total Charts disposed since startup"
    );
    let _ = writeln!(out, "# TYPE seo_dashboard_charts_disposed_total counter");
    let _ = writeln!(out, "seo_dashboard_charts_disposed_total {disposed}");
    let _ = writeln!(
        out,
        "# HELP seo_dashboard_reports_generated_total Report generations completed since startup"
    );
    let _ = writeln!(out, "# TYPE seo_dashboard_reports_generated_total counter");
    let _ = writeln!(out, "seo_dashboard_reports_generated_total {reports}");
    let _ = writeln!(
        out,
        "# HELP seo_dashboard_fetch_failures_total Failed dataset fetches since startup"
    );
    let _ = writeln!(out, "# TYPE seo_dashboard_fetch_failures_total counter");
    let _ = writeln!(out, "seo_dashboard_fetch_failures_total {failures}");

    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], out)
}
