//! The inbound HTTP surface: a JSON API plus a static browsing UI.

mod api;

use crate::Result;
use crate::store::Catalog;
use axum::Router;
use ohno::IntoAppError;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

const LOG_TARGET: &str = "    server";

#[derive(Debug, Clone)]
pub struct AppState {
    pub catalog: Catalog,
}

/// Build the service router: `/api/*` JSON endpoints with the browsing UI
/// served from `static/` for everything else.
#[must_use]
pub fn router(catalog: Catalog) -> Router {
    Router::new()
        .nest("/api", api::routes())
        .fallback_service(ServeDir::new("static"))
        .layer(CorsLayer::permissive())
        .with_state(AppState { catalog })
}

/// Serve the catalog until the process exits.
pub async fn serve(bind_addr: &str, catalog: Catalog) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .into_app_err_with(|| format!("unable to bind '{bind_addr}'"))?;

    log::info!(target: LOG_TARGET, "Listening on http://{bind_addr}");

    axum::serve(listener, router(catalog)).await.into_app_err("HTTP server failed")
}
