//! Configuration module for environment variable parsing.
//!
//! The configuration is read once at startup and shared with every handler
//! through `AppState`. Handlers never consult the environment themselves.

use std::env;
use std::time::Duration;
use tracing::warn;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Public site origin used for canonical URLs, sitemap and JSON-LD
    pub site_url: String,

    /// Deployment environment name reported by the health endpoint
    pub environment: String,

    // =========================================================================
    // Record Store
    // =========================================================================

    /// Supabase project URL
    pub supabase_url: String,

    /// Supabase service-role key used for server-side reads
    pub supabase_service_key: Option<String>,

    /// HTTP request timeout in milliseconds for record store calls
    pub request_timeout_ms: u64,

    // =========================================================================
    // Revalidation
    // =========================================================================

    /// Shared secret used to sign database webhook payloads
    pub webhook_secret: Option<String>,

    /// API key for the manual revalidation trigger
    pub revalidate_api_key: Option<String>,

    /// Age in seconds after which a cached page is regenerated
    pub page_revalidate_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: parse_number("PORT", 8080),

            site_url: non_empty("SITE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "https://localhost:3000".to_string()),

            environment: non_empty("APP_ENV").unwrap_or_else(|| "development".to_string()),

            supabase_url: non_empty("SUPABASE_URL")
                .unwrap_or_else(|| "http://localhost:54321".to_string()),

            supabase_service_key: non_empty("SUPABASE_SERVICE_KEY"),

            request_timeout_ms: parse_number("REQUEST_TIMEOUT_MS", 8000),

            webhook_secret: credential("SUPABASE_WEBHOOK_SECRET"),

            revalidate_api_key: credential("REVALIDATE_API_KEY"),

            page_revalidate_seconds: parse_number("PAGE_REVALIDATE_SECONDS", 3600),
        }
    }

    /// Webhook secret, if one is configured and non-blank.
    pub fn webhook_secret(&self) -> Option<&str> {
        configured(&self.webhook_secret)
    }

    /// Manual trigger API key, if one is configured and non-blank.
    pub fn revalidate_api_key(&self) -> Option<&str> {
        configured(&self.revalidate_api_key)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn page_revalidate_after(&self) -> Duration {
        Duration::from_secs(self.page_revalidate_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            site_url: "https://localhost:3000".to_string(),
            environment: "development".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: None,
            request_timeout_ms: 8000,
            webhook_secret: None,
            revalidate_api_key: None,
            page_revalidate_seconds: 3600,
        }
    }
}

/// Blank values count as unset; anything else is returned byte for byte.
fn configured(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Read a variable, treating blank values as unset.
fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a secret or key. Surrounding whitespace is part of the value, since
/// the signer keys its HMAC with the exact bytes it was given.
fn credential(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a numeric variable, falling back to the default on absence or error.
fn parse_number<T: std::str::FromStr>(name: &str, default: T) -> T {
    let raw = match non_empty(name) {
        Some(v) => v,
        None => return default,
    };

    match raw.parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid number, using default");
            default
        }
    }
}
