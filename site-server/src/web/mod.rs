//! Web server module.
//!
//! This module provides:
//! - The signed database webhook and manual trigger for cache revalidation
//! - A health check that probes the record store
//! - Broker pages, listing, sitemap and robots.txt served from the page cache

pub mod error;
pub mod handlers;
pub mod pages;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ErrorResponse};
pub use handlers::{
    health, manual_revalidate, webhook_revalidate, AppState, HealthResponse, ManualParams,
    ManualResponse, WebhookResponse, API_KEY_HEADER,
};
pub use pages::{broker_listing, broker_page, robots, sitemap};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route(
            "/api/revalidate",
            post(webhook_revalidate).get(manual_revalidate),
        )
        .route("/brokers", get(broker_listing))
        .route("/brokers/:slug", get(broker_page))
        .route("/sitemap.xml", get(sitemap))
        .route("/robots.txt", get(robots))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
