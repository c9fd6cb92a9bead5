//! Record store access.
//!
//! Pages are built from rows read through the `RecordStore` trait. The
//! production implementation talks to Supabase's PostgREST endpoint.

pub mod supabase;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use supabase::SupabaseStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store request failed: {0}")]
    Transport(String),

    #[error("record store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("record store response could not be decoded: {0}")]
    Decode(String),

    #[error("record store is not configured: {0}")]
    NotConfigured(&'static str),
}

/// Row filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, String),
}

/// A read against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    /// Column and ascending flag
    pub order: Option<(String, bool)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(Filter::Eq(column.into(), value.into()));
        self
    }

    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some((column.into(), ascending));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn query(&self, query: &Query) -> Result<Vec<Value>, StoreError>;
}

/// Stand-in used when no client could be configured; every read fails.
pub struct UnconfiguredStore {
    reason: &'static str,
}

impl UnconfiguredStore {
    pub fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

#[async_trait]
impl RecordStore for UnconfiguredStore {
    async fn query(&self, _query: &Query) -> Result<Vec<Value>, StoreError> {
        Err(StoreError::NotConfigured(self.reason))
    }
}
