//! BrokerSite Web Server - broker review pages and cache revalidation.
//!
//! This binary:
//! - Serves broker pages from an in-process, periodically revalidated cache
//! - Receives signed database webhooks and invalidates affected pages
//! - Exposes a manual revalidation trigger and a health check

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use brokersite::store::{RecordStore, StoreError, UnconfiguredStore};
use brokersite::{web, AppState, Config, SupabaseStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        site_url = %config.site_url,
        environment = %config.environment,
        webhook_secret_configured = config.webhook_secret().is_some(),
        api_key_configured = config.revalidate_api_key().is_some(),
        service_key_configured = config.supabase_service_key.is_some(),
        page_revalidate_seconds = config.page_revalidate_seconds,
        "config_loaded"
    );

    // Pages and health report the store error per request rather than
    // refusing to start.
    let store: Arc<dyn RecordStore> = match SupabaseStore::new(
        &config.supabase_url,
        config.supabase_service_key.as_deref(),
        config.request_timeout(),
    ) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(error = %e, "record_store_unavailable");
            let reason = match e {
                StoreError::NotConfigured(reason) => reason,
                _ => "record store client could not be configured",
            };
            Arc::new(UnconfiguredStore::new(reason))
        }
    };

    let port = config.port;
    let state = AppState::new(config, store);
    let app = web::router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
