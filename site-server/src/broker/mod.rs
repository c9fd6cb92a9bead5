//! Broker review content: record types, store reads, SEO and rendering.

pub mod render;
pub mod repository;
pub mod seo;
pub mod types;

pub use repository::{fetch_published_broker, list_published_brokers, probe};
pub use types::{Broker, BrokerStatus, BrokerSummary};
