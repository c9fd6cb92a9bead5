//! Page cache for generated pages.
//!
//! ## Lifecycle
//!
//! ```text
//! request → get(path) ─hit→ serve
//!                     └miss/stale→ render → insert(path, page) → serve
//! webhook → invalidate_path / invalidate_tag → next request regenerates
//! ```

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::{CachedPage, MemoryPageCache};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("invalid cache path {0:?}: must start with '/'")]
    InvalidPath(String),

    #[error("invalid cache tag: must not be empty")]
    InvalidTag,

    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Invalidation interface of a page cache.
///
/// Both calls are idempotent: invalidating something already stale or
/// absent succeeds and changes nothing.
#[async_trait]
pub trait PageCache: Send + Sync {
    /// Mark the page at `path` stale.
    async fn invalidate_path(&self, path: &str) -> Result<(), CacheError>;

    /// Mark every page carrying `tag` stale.
    async fn invalidate_tag(&self, tag: &str) -> Result<(), CacheError>;
}
