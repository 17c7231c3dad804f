//! Completed local operations.
//!
//! An [`OperationCompletion`] is produced exactly once per successful remote
//! operation, at the moment the engine learns about it.

use crate::{SyncRecord, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which kind of local operation completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Uploaded,
    Updated,
    Deleted,
}

impl OperationKind {
    /// All kinds, in reconciliation precedence order (highest first).
    pub const PRECEDENCE: [OperationKind; 3] = [
        OperationKind::Deleted,
        OperationKind::Uploaded,
        OperationKind::Updated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Uploaded => "uploaded",
            OperationKind::Updated => "updated",
            OperationKind::Deleted => "deleted",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A local operation that the remote store acknowledged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationCompletion<R> {
    record: R,
    completed_at: Timestamp,
    kind: OperationKind,
}

impl<R: SyncRecord> OperationCompletion<R> {
    pub fn new(record: R, completed_at: Timestamp, kind: OperationKind) -> Self {
        Self {
            record,
            completed_at,
            kind,
        }
    }

    pub fn record(&self) -> &R {
        &self.record
    }

    pub fn record_id(&self) -> &str {
        self.record.record_id()
    }

    /// When this process learned that the operation succeeded.
    pub fn completed_at(&self) -> Timestamp {
        self.completed_at
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}
