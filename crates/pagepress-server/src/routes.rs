use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use pagepress_core::{is_valid_url, sanitize_filename_default, Error, PrintRequest, TitleRequest};
use serde_json::json;
use tracing::warn;

use crate::AppState;

pub async fn healthz() -> &'static str {
    "ok"
}

fn invalid_url_response() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "url must be an absolute http(s) URL" })),
    )
        .into_response()
}

fn error_response(e: Error) -> Response {
    let status = match e {
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::Upstream(_) | Error::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!("request failed: {e}");
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

/// `POST /api/suggest-title`: fetch the page's raw HTML and ask the title
/// client for a name. Upstream failures here are hard errors, unlike the
/// optional suggestion inside the print flow.
pub async fn suggest_title(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TitleRequest>,
) -> Response {
    if !is_valid_url(&req.url) {
        return invalid_url_response();
    }

    let html = match state.fetcher.fetch_html(&req.url).await {
        Ok(html) => html,
        Err(e) => return error_response(e),
    };

    match state.titles.suggest(&html, &req.url).await {
        Ok(suggestion) => {
            let title = sanitize_filename_default(&suggestion.unwrap_or_default());
            (StatusCode::OK, Json(json!({ "title": title }))).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// `POST /api/print-pdf`: render the page and stream the bytes back as an
/// attachment. Render failures come back as plain text, not JSON, so the
/// companion page can show them directly.
pub async fn print_pdf(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PrintRequest>,
) -> Response {
    if !is_valid_url(&req.url) {
        return invalid_url_response();
    }

    let req = req.normalized();
    match state.renderer.render(&req).await {
        Ok(doc) => {
            let mut headers = HeaderMap::new();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/pdf"),
            );
            headers.insert(header::CONTENT_DISPOSITION, attachment_disposition(&doc.filename));
            (StatusCode::OK, headers, doc.pdf).into_response()
        }
        Err(e) => {
            warn!("render failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to generate PDF: {e}"),
            )
                .into_response()
        }
    }
}

fn attachment_disposition(filename: &str) -> HeaderValue {
    // Sanitized names still admit non-ASCII; header values do not.
    let value = format!("attachment; filename=\"{filename}\"");
    HeaderValue::from_str(&value)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"document.pdf\""))
}
