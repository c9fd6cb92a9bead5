//! Issues invalidation calls against the page cache.
//!
//! Dispatch is best-effort: every target is attempted even when an earlier
//! one fails, and failures are reported back rather than retried.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use super::types::InvalidationTarget;
use crate::cache::PageCache;

/// All targets were invalidated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ack {
    pub invalidated: Vec<InvalidationTarget>,
}

/// A target whose invalidation call failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedTarget {
    pub target: InvalidationTarget,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum InvalidationError {
    #[error("{} invalidation targets failed", .failed.len())]
    Partial {
        failed: Vec<FailedTarget>,
        succeeded: Vec<InvalidationTarget>,
    },
}

#[derive(Clone)]
pub struct Dispatcher {
    cache: Arc<dyn PageCache>,
}

impl Dispatcher {
    pub fn new(cache: Arc<dyn PageCache>) -> Self {
        Self { cache }
    }

    /// Invalidate each target in order.
    pub async fn invalidate(
        &self,
        targets: &[InvalidationTarget],
    ) -> Result<Ack, InvalidationError> {
        let mut succeeded = Vec::with_capacity(targets.len());
        let mut failed = Vec::new();

        for target in targets {
            let outcome = match target {
                InvalidationTarget::Path(path) => self.cache.invalidate_path(path).await,
                InvalidationTarget::Tag(tag) => self.cache.invalidate_tag(tag).await,
            };

            match outcome {
                Ok(()) => {
                    info!(invalidation = %target, "revalidated");
                    succeeded.push(target.clone());
                }
                Err(e) => {
                    warn!(invalidation = %target, error = %e, "revalidate_failed");
                    failed.push(FailedTarget {
                        target: target.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if failed.is_empty() {
            Ok(Ack {
                invalidated: succeeded,
            })
        } else {
            Err(InvalidationError::Partial { failed, succeeded })
        }
    }
}
