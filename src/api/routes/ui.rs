//! Viewer Page
//!
//! GET / - static controller page. It opens `/ws?role=controller`, sends
//! commands and renders the status and image frames it receives.

use axum::response::Html;

const VIEWER_HTML: &str = include_str!("../../../assets/index.html");

/// GET /
pub async fn index() -> Html<&'static str> {
    Html(VIEWER_HTML)
}
