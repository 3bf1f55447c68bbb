//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The built front-end is served as static files with an `index.html`
//! fallback for client-side routes. Every request except the health check
//! and static bundles passes through the edge redirect filter first.


pub mod gate;

use std::path::Path;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::get;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Edge router: health check, filtered static site.
pub fn app(state: AppState, site_dir: &Path) -> Router {
    let site = ServeDir::new(site_dir)
        .append_index_html_on_directories(true)
        .fallback(ServeFile::new(site_dir.join("index.html")));

    Router::new()
        .route("/healthz", get(healthz))
        .fallback_service(site)
        .layer(middleware::from_fn_with_state(state.clone(), gate::edge_redirect))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
