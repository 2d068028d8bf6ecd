use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use rust_embed::Embed;

#[derive(Embed)]
#[folder = "src/dashboard/assets/"]
struct DashboardAssets;

/// GET /{*path} — Embedded dashboard scripts and styles.
pub async fn serve_asset(Path(path): Path<String>) -> Response {
    serve_file(&path)
}

/// GET / — The dashboard page.
pub async fn serve_index() -> Response {
    serve_file("index.html")
}

fn serve_file(path: &str) -> Response {
    let Some(content) = DashboardAssets::get(path) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            // Assets change with every release and are tiny.
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
        content.data.into_owned(),
    )
        .into_response()
}
