//! HTTP surface - an axum router exposing the core operations as JSON.
//!
//! Handlers stay thin: extract, call into [`crate::core`], wrap the result.
//! Errors turn into responses through [`error`].

mod auth;
mod categories;
mod customers;
pub mod error;
mod orders;
mod products;
mod reports;

use crate::{config::settings::Settings, errors::Result};
use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Connection pool
    pub db: DatabaseConnection,
    /// Rows per page on list endpoints
    pub page_size: u64,
}

impl AppState {
    /// State for a connection and the configured page size.
    #[must_use]
    pub const fn new(db: DatabaseConnection, page_size: u64) -> Self {
        Self { db, page_size }
    }
}

/// `?page=` for paginated listings.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// 1-based page, first page when absent
    pub page: Option<u64>,
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(auth::router())
        .merge(customers::router())
        .merge(categories::router())
        .merge(products::router())
        .merge(orders::router())
        .merge(reports::router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Binds the configured address and serves until the process stops.
pub async fn serve(settings: &Settings, db: DatabaseConnection) -> Result<()> {
    let app = router(AppState::new(db, settings.listing.page_size));

    info!("Starting pastry shop service at {}", settings.server.address);
    let listener = tokio::net::TcpListener::bind(&settings.server.address).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
