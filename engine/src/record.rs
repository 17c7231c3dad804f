//! Record types the engine reconciles.
//!
//! The engine is generic over anything implementing [`SyncRecord`]. Records are
//! immutable value snapshots: a new value with the same identity supersedes an
//! old one, it is never mutated in place.

use crate::{CollectionName, RecordId, Timestamp};
use serde::{Deserialize, Serialize};

/// An entity with a stable identity and a last-touched timestamp.
pub trait SyncRecord: Clone + Send + Sync + 'static {
    /// Identity, unique within one record type.
    fn record_id(&self) -> &str;

    /// When the remote store last saw this record change.
    fn touched_at(&self) -> Timestamp;
}

/// A generic remote record with an opaque JSON payload.
///
/// The payload schema (treatment, profile, glucose entry, ...) belongs to the
/// caller; the engine only looks at identity and touch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique identifier for this record
    pub id: RecordId,
    /// Record type this record belongs to
    pub collection: CollectionName,
    /// Last-touched time reported by the remote store (milliseconds since epoch)
    pub touched_at: Timestamp,
    /// The actual data payload
    pub payload: serde_json::Value,
}

impl Record {
    /// Create a new record.
    pub fn new(
        id: impl Into<RecordId>,
        collection: impl Into<CollectionName>,
        touched_at: Timestamp,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            touched_at,
            payload,
        }
    }
}

impl SyncRecord for Record {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn touched_at(&self) -> Timestamp {
        self.touched_at
    }
}
