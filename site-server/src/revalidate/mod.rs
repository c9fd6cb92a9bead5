//! Cache revalidation driven by record store change notifications.
//!
//! ## Flow
//!
//! ```text
//! POST /api/revalidate → verify_signature → ChangeNotification
//!     → RoutingTable::route → Dispatcher::invalidate → PageCache
//! ```

pub mod dispatcher;
pub mod router;
pub mod signature;
pub mod types;

pub use dispatcher::{Ack, Dispatcher, FailedTarget, InvalidationError};
pub use router::{broker_tag, ChildRule, EntityRule, RoutingTable};
pub use signature::{verify_signature, SIGNATURE_HEADER};
pub use types::{ChangeNotification, InvalidationTarget, NotificationError, Operation};
