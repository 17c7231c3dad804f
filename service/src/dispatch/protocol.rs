//! Event and notice definitions.
//!
//! Events carry no timestamps for local completions: the engine stamps them
//! when they are delivered.

use scoutsync_engine::{Change, CollectionName, Timestamp};
use serde::{Deserialize, Serialize};

/// Events sent from collaborators to a dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent<R> {
    /// The downloader fetched the current remote record set.
    Fetched {
        /// Every record currently present remotely
        records: Vec<R>,
        /// Reference time of the fetch; stamped at delivery when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reference_time: Option<Timestamp>,
    },

    /// The uploader created these records.
    Uploaded {
        records: Vec<R>,
    },

    /// The uploader updated these records.
    Updated {
        records: Vec<R>,
    },

    /// The uploader deleted these records.
    Deleted {
        records: Vec<R>,
    },
}

impl<R> SyncEvent<R> {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncEvent::Fetched { .. } => "fetched",
            SyncEvent::Uploaded { .. } => "uploaded",
            SyncEvent::Updated { .. } => "updated",
            SyncEvent::Deleted { .. } => "deleted",
        }
    }
}

/// A reconciled change sent to downstream subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChangeNotice<R> {
    /// Record type the change belongs to
    pub collection: CollectionName,
    /// The change itself
    pub change: Change<R>,
}
