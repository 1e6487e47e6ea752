//! REST API over the substation store.
//!
//! All routes live under `/api`. JSON everywhere except the exports (xlsx and
//! CSV downloads) and the import, which takes the raw workbook as its body.

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::TokenRegistry;
use crate::config::AppConfig;
use crate::error::Result;
use crate::store::Store;

pub use types::{ApiError, ErrorResponse};

/// Upper bound for uploaded workbooks.
const IMPORT_BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Application state shared across all request handlers.
///
/// The store serializes its own access; everything else is read-only.
pub struct AppState {
    pub store: Store,
    pub config: AppConfig,
    pub tokens: TokenRegistry,
}

impl AppState {
    pub fn new(store: Store, config: AppConfig) -> Self {
        let tokens = TokenRegistry::from_config(&config.auth);
        Self {
            store,
            config,
            tokens,
        }
    }
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route(
            "/api/substations",
            get(handlers::list_substations).post(handlers::create_substation),
        )
        .route(
            "/api/substations/{id}",
            get(handlers::get_substation)
                .put(handlers::update_substation)
                .delete(handlers::delete_substation),
        )
        .route(
            "/api/substations/{id}/measurements",
            get(handlers::substation_measurements),
        )
        .route(
            "/api/measurements/{shift}",
            post(handlers::upsert_measurements).patch(handlers::update_measurements),
        )
        .route("/api/maintenance/normalize", post(handlers::normalize_rows))
        .route("/api/maintenance/recompute", post(handlers::recompute_rows))
        .route("/api/dashboard", get(handlers::dashboard))
        .route("/api/export.xlsx", get(handlers::export_xlsx))
        .route("/api/export.csv", get(handlers::export_csv))
        .route(
            "/api/import",
            post(handlers::import_xlsx).layer(DefaultBodyLimit::max(IMPORT_BODY_LIMIT)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds to `addr` and serves the API until the process is stopped.
///
/// # Errors
///
/// Returns [`crate::error::GarduError::Io`] if the listener cannot bind or
/// the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
