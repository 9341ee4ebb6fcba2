use std::path::Path;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use pagepress_core::RenderBackend;
use pagepress_local::{title::TitleClient, HtmlFetcher};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod routes;

/// Shared per-process state. The renderer sits behind the trait object so
/// the handlers can be exercised against a stub backend.
pub struct AppState {
    pub renderer: Arc<dyn RenderBackend>,
    pub fetcher: HtmlFetcher,
    pub titles: TitleClient,
}

/// Build the full router: the two API endpoints, a liveness probe, and the
/// companion front-end served for everything else.
pub fn app(state: Arc<AppState>, static_dir: &Path) -> Router {
    Router::new()
        .route("/api/suggest-title", post(routes::suggest_title))
        .route("/api/print-pdf", post(routes::print_pdf))
        .route("/healthz", get(routes::healthz))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
