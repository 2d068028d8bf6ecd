use seo_dashboard::config::Config;
use seo_dashboard::server;
use seo_dashboard::session::init::spawn_signin_listener;
use seo_dashboard::state::AppState;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seo_dashboard=info,tower_http=info".into()),
        )
        .init();

    // Load configuration
    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref().map(std::path::Path::new));

    tracing::info!(
        host = %config.host,
        port = config.port,
        oauth_configured = !config.client_id.is_empty(),
        "Starting SEO dashboard"
    );
    if config.client_id.is_empty() {
        tracing::warn!(
            "No SEO_DASHBOARD_CLIENT_ID set; Google sign-in is disabled. Use POST /api/auth/token to supply an access token."
        );
    }

    let state = Arc::new(AppState::new(config));

    // Initialization failures are shown on the dashboard; the server still starts.
    if !state.initialize() {
        tracing::warn!("Reporting clients unavailable; reports will be skipped");
    }
    spawn_signin_listener(Arc::clone(&state));

    let app = server::build_router(Arc::clone(&state));
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    tracing::info!(addr = %addr, "Listening");
    axum::serve(listener, app).await.expect("Server error");
}
