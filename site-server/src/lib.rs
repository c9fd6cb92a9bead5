//! BrokerSite - Broker review pages with webhook-driven cache revalidation.
//!
//! This library backs the `brokersite-web` binary:
//! - Serves broker review pages, the listing, sitemap and robots.txt from
//!   an in-process page cache that revalidates periodically
//! - Accepts signed database webhooks and invalidates affected pages
//! - Accepts an API-key protected manual invalidation trigger
//!
//! ## Architecture
//!
//! ```text
//! Record store change → POST /api/revalidate → verify → route → dispatch → Page cache
//! GET /brokers/:slug  → Page cache ─miss→ Record store → render → Page cache
//! ```

pub mod broker;
pub mod cache;
pub mod config;
pub mod revalidate;
pub mod store;
pub mod util;
pub mod web;

// Re-export commonly used types
pub use cache::{MemoryPageCache, PageCache};
pub use config::Config;
pub use revalidate::{
    verify_signature, ChangeNotification, Dispatcher, InvalidationTarget, RoutingTable,
};
pub use store::{RecordStore, SupabaseStore};
pub use web::AppState;
