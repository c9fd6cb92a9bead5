//! API endpoint handlers.
//!
//! The revalidation handlers do only this:
//! 1. Check credentials (signature or API key)
//! 2. Work out which cached pages are stale
//! 3. Invalidate them and acknowledge
//!
//! Pages are regenerated lazily on the next request.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::broker;
use crate::cache::MemoryPageCache;
use crate::revalidate::{
    signature::constant_time_compare, verify_signature, ChangeNotification, Dispatcher,
    FailedTarget, InvalidationError, InvalidationTarget, RoutingTable, SIGNATURE_HEADER,
};
use crate::store::{RecordStore, StoreError};
use crate::util::{runtime, timestamp};
use crate::web::error::ApiError;
use crate::Config;

/// Header carrying the manual trigger API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn RecordStore>,
    pub pages: MemoryPageCache,
    pub dispatcher: Dispatcher,
    pub routing: Arc<RoutingTable>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn RecordStore>) -> Self {
        let pages = MemoryPageCache::new(config.page_revalidate_after());
        let dispatcher = Dispatcher::new(Arc::new(pages.clone()));
        Self {
            config: Arc::new(config),
            store,
            pages,
            dispatcher,
            routing: Arc::new(RoutingTable::brokers()),
            started_at: Instant::now(),
        }
    }

    /// Replace the dispatcher, e.g. to invalidate an external cache.
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }
}

// =============================================================================
// Health Check
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub database: &'static str,
    pub cache: &'static str,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub version: &'static str,
    pub environment: String,
    pub services: ServiceStatus,
    pub uptime: f64,
    pub memory: runtime::MemoryUsage,
}

/// Health check endpoint.
///
/// Probes the record store; 503 when the probe fails, 500 when the store
/// cannot be used at all.
pub async fn health(State(state): State<AppState>) -> Response {
    let database = match broker::probe(state.store.as_ref()).await {
        Ok(()) => "healthy",
        Err(StoreError::NotConfigured(reason)) => {
            error!(reason = %reason, "health_store_not_configured");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": reason,
                    "timestamp": timestamp(),
                })),
            )
                .into_response();
        }
        Err(e) => {
            warn!(error = %e, "health_store_probe_failed");
            "unhealthy"
        }
    };

    let healthy = database == "healthy";
    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" },
        timestamp: timestamp(),
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.clone(),
        services: ServiceStatus {
            database,
            cache: "healthy",
        },
        uptime: runtime::uptime_seconds(state.started_at),
        memory: runtime::memory_usage(),
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response)).into_response()
}

// =============================================================================
// Database Webhook
// =============================================================================

/// Webhook acknowledgement.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<FailedTarget>,
}

/// Database webhook endpoint.
///
/// This endpoint:
/// 1. Refuses to run without a configured secret
/// 2. Verifies the HMAC signature of the raw body (an unreadable or
///    oversized body is answered with its rejection status as JSON)
/// 3. Routes the change to invalidation targets and dispatches them
///
/// Partial invalidation failures are reported as warnings; the periodic
/// revalidation window repairs anything left stale.
pub async fn webhook_revalidate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let secret = state
        .config
        .webhook_secret()
        .ok_or(ApiError::Configuration("SUPABASE_WEBHOOK_SECRET is not set"))?;

    let body = body?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::Unauthorized("Missing signature"))?;

    if !verify_signature(&body, signature, secret.as_bytes()) {
        return Err(ApiError::Unauthorized("Invalid signature"));
    }

    let notification = ChangeNotification::from_slice(&body)?;

    info!(
        table = %notification.table,
        operation = ?notification.operation,
        has_record = notification.record.is_some(),
        has_old_record = notification.previous_record.is_some(),
        "webhook_received"
    );

    let targets = state.routing.route(&notification);

    let warnings = match state.dispatcher.invalidate(&targets).await {
        Ok(ack) => {
            info!(
                table = %notification.table,
                invalidated = ack.invalidated.len(),
                "webhook_revalidated"
            );
            Vec::new()
        }
        Err(InvalidationError::Partial { failed, succeeded }) => {
            warn!(
                table = %notification.table,
                failed = failed.len(),
                succeeded = succeeded.len(),
                "webhook_revalidation_partial"
            );
            failed
        }
    };

    Ok(Json(WebhookResponse {
        success: true,
        message: format!("Revalidation triggered for {}", notification.table),
        timestamp: timestamp(),
        warnings,
    }))
}

// =============================================================================
// Manual Trigger
// =============================================================================

/// Manual trigger query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ManualParams {
    pub path: Option<String>,
    pub tag: Option<String>,
}

/// Manual trigger response.
#[derive(Debug, Serialize)]
pub struct ManualResponse {
    pub success: bool,
    pub revalidated: Value,
    pub timestamp: String,
}

/// Choose the single target of a manual trigger.
///
/// `path` wins over `tag`; with neither, the listing page is invalidated.
pub fn manual_target(params: &ManualParams, listing_path: &str) -> (InvalidationTarget, Value) {
    let path = params.path.as_deref().filter(|p| !p.is_empty());
    let tag = params.tag.as_deref().filter(|t| !t.is_empty());

    match (path, tag) {
        (Some(path), tag) => {
            if tag.is_some() {
                warn!(path = %path, "manual_revalidate_tag_ignored");
            }
            (InvalidationTarget::path(path), json!({ "path": path }))
        }
        (None, Some(tag)) => (InvalidationTarget::tag(tag), json!({ "tag": tag })),
        (None, None) => (
            InvalidationTarget::path(listing_path),
            json!("all listing pages"),
        ),
    }
}

/// Manual revalidation endpoint, authenticated by `x-api-key`.
pub async fn manual_revalidate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ManualParams>,
) -> Result<Json<ManualResponse>, ApiError> {
    let expected = state
        .config
        .revalidate_api_key()
        .ok_or(ApiError::Configuration("REVALIDATE_API_KEY is not set"))?;

    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !constant_time_compare(provided, expected) {
        return Err(ApiError::Unauthorized("Unauthorized"));
    }

    let (target, revalidated) = manual_target(&params, state.routing.listing_path());
    info!(invalidation = %target, "manual_revalidate");

    state
        .dispatcher
        .invalidate(std::slice::from_ref(&target))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(ManualResponse {
        success: true,
        revalidated,
        timestamp: timestamp(),
    }))
}
