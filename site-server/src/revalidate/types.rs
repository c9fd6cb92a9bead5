//! Change notification and invalidation target types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A row as delivered by the database webhook.
pub type Record = Map<String, Value>;

/// Database operation that produced a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

/// A verified change notification from the record store.
///
/// Lives only for the duration of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeNotification {
    #[serde(rename = "type")]
    pub operation: Operation,
    pub table: String,
    #[serde(default)]
    pub record: Option<Record>,
    #[serde(default, rename = "old_record")]
    pub previous_record: Option<Record>,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("notification for {0} carries neither record nor old_record")]
    MissingRecords(String),

    #[error("INSERT notification for {0} must not carry old_record")]
    UnexpectedPreviousRecord(String),
}

impl ChangeNotification {
    /// Parse a notification from the raw webhook body.
    pub fn from_slice(body: &[u8]) -> Result<Self, NotificationError> {
        let notification: ChangeNotification = serde_json::from_slice(body)?;
        notification.validate()?;
        Ok(notification)
    }

    fn validate(&self) -> Result<(), NotificationError> {
        if self.record.is_none() && self.previous_record.is_none() {
            return Err(NotificationError::MissingRecords(self.table.clone()));
        }
        if self.operation == Operation::Insert && self.previous_record.is_some() {
            return Err(NotificationError::UnexpectedPreviousRecord(
                self.table.clone(),
            ));
        }
        Ok(())
    }

    /// Field from the new record.
    pub fn current(&self, field: &str) -> Option<&Value> {
        self.record.as_ref().and_then(|r| r.get(field))
    }

    /// Field from the previous record.
    pub fn previous(&self, field: &str) -> Option<&Value> {
        self.previous_record.as_ref().and_then(|r| r.get(field))
    }
}

/// Something in the page cache that can be marked stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidationTarget {
    Path(String),
    Tag(String),
}

impl InvalidationTarget {
    pub fn path(path: impl Into<String>) -> Self {
        InvalidationTarget::Path(path.into())
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        InvalidationTarget::Tag(tag.into())
    }
}

impl fmt::Display for InvalidationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidationTarget::Path(p) => write!(f, "path:{}", p),
            InvalidationTarget::Tag(t) => write!(f, "tag:{}", t),
        }
    }
}
