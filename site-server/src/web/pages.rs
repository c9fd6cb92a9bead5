//! Page handlers served through the page cache.
//!
//! A fresh cached page is returned as-is; otherwise the page is rebuilt
//! from the record store and cached under its path and tags. A rebuild that
//! overlapped an invalidation is served but not cached.

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{error, info};

use crate::broker::{self, render, seo};
use crate::cache::CachedPage;
use crate::revalidate::broker_tag;
use crate::store::StoreError;
use crate::util::timestamp;
use crate::web::handlers::AppState;

const HTML: &str = "text/html; charset=utf-8";
const XML: &str = "application/xml; charset=utf-8";
const TEXT: &str = "text/plain; charset=utf-8";

/// Cache tag carried by listing-derived pages.
pub const LISTING_TAG: &str = "brokers";

fn serve(page: CachedPage, hit: bool) -> Response {
    let mut response = ([(header::CONTENT_TYPE, page.content_type)], page.body).into_response();
    response.headers_mut().insert(
        "x-cache",
        HeaderValue::from_static(if hit { "HIT" } else { "MISS" }),
    );
    response
}

fn store_failure(path: &str, e: StoreError) -> Response {
    error!(path = %path, error = %e, "page_generation_failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, TEXT)],
        "Internal server error",
    )
        .into_response()
}

/// Broker review page.
pub async fn broker_page(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let path = format!("/brokers/{}", slug);

    if let Some(page) = state.pages.get(&path).await {
        return serve(page, true);
    }

    let generation = state.pages.generation();
    let broker = match broker::fetch_published_broker(state.store.as_ref(), &slug).await {
        Ok(Some(broker)) => broker,
        Ok(None) => {
            let html = render::render_not_found(&seo::not_found_metadata());
            return (StatusCode::NOT_FOUND, [(header::CONTENT_TYPE, HTML)], html).into_response();
        }
        Err(e) => return store_failure(&path, e),
    };

    let site_url = &state.config.site_url;
    let meta = seo::page_metadata(&broker, site_url);
    let schemas = seo::structured_data(&broker, site_url);
    let html = render::render_broker_page(&broker, &meta, &schemas);

    let page = CachedPage::new(html, HTML).with_tag(broker_tag(&broker.id));
    state
        .pages
        .insert_if_unchanged(path.clone(), page.clone(), generation)
        .await;
    info!(path = %path, broker_id = %broker.id, "page_generated");

    serve(page, false)
}

/// Listing of published brokers.
pub async fn broker_listing(State(state): State<AppState>) -> Response {
    let path = state.routing.listing_path().to_string();

    if let Some(page) = state.pages.get(&path).await {
        return serve(page, true);
    }

    let generation = state.pages.generation();
    let brokers = match broker::list_published_brokers(state.store.as_ref()).await {
        Ok(brokers) => brokers,
        Err(e) => return store_failure(&path, e),
    };

    let html = render::render_listing(&brokers, &state.config.site_url);
    let page = CachedPage::new(html, HTML).with_tag(LISTING_TAG);
    state
        .pages
        .insert_if_unchanged(path.clone(), page.clone(), generation)
        .await;
    info!(path = %path, brokers = brokers.len(), "page_generated");

    serve(page, false)
}

pub async fn sitemap(State(state): State<AppState>) -> Response {
    let path = state.routing.entity.sitemap_path.clone();

    if let Some(page) = state.pages.get(&path).await {
        return serve(page, true);
    }

    let generation = state.pages.generation();
    let brokers = match broker::list_published_brokers(state.store.as_ref()).await {
        Ok(brokers) => brokers,
        Err(e) => return store_failure(&path, e),
    };

    let xml = seo::sitemap_xml(&state.config.site_url, &brokers, &timestamp());
    let page = CachedPage::new(xml, XML).with_tag(LISTING_TAG);
    state
        .pages
        .insert_if_unchanged(path.clone(), page.clone(), generation)
        .await;
    info!(path = %path, brokers = brokers.len(), "page_generated");

    serve(page, false)
}

pub async fn robots(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, TEXT)],
        seo::robots_txt(&state.config.site_url),
    )
        .into_response()
}
