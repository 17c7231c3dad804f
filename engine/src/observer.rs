//! Observer interfaces at the engine boundary.
//!
//! Collaborators push events in: the downloader reports fetched batches, the
//! uploader reports completed creates, updates and deletes. The engine pushes
//! reconciled [`Change`]s out to whichever [`ChangeSink`]s subscribed.
//!
//! Each event must be delivered at most once per underlying network
//! operation. An uploader must not report an operation that failed.

use crate::{RecordId, SyncRecord, Timestamp};
use serde::{Deserialize, Serialize};

/// A batch of records returned by one poll of the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedBatch<R> {
    /// Every record currently present remotely
    pub records: Vec<R>,
    /// Reference time of the fetch; stamped at delivery when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_time: Option<Timestamp>,
}

impl<R> FetchedBatch<R> {
    /// A batch whose reference time is taken when it reaches the engine.
    pub fn new(records: Vec<R>) -> Self {
        Self {
            records,
            reference_time: None,
        }
    }

    /// A batch with an explicit reference time.
    pub fn at(records: Vec<R>, reference_time: Timestamp) -> Self {
        Self {
            records,
            reference_time: Some(reference_time),
        }
    }
}

/// A net change visible to the rest of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "record", rename_all = "lowercase")]
pub enum Change<R> {
    /// First observation of a record this process did not create
    Created(R),
    /// A known record changed and this process did not change it
    Updated(R),
    /// A known record disappeared and this process did not delete it
    Deleted(RecordId),
}

impl<R: SyncRecord> Change<R> {
    pub fn record_id(&self) -> &str {
        match self {
            Change::Created(record) | Change::Updated(record) => record.record_id(),
            Change::Deleted(id) => id,
        }
    }
}

/// Receives fetched batches from the downloader.
pub trait DownloaderObserver<R>: Send + Sync {
    fn did_fetch(&self, batch: FetchedBatch<R>);
}

/// Receives successful operation reports from the uploader.
pub trait UploaderObserver<R>: Send + Sync {
    fn did_upload(&self, records: Vec<R>);

    fn did_update(&self, records: Vec<R>);

    fn did_delete(&self, records: Vec<R>);
}

/// Downstream consumer of reconciled changes.
pub trait ChangeSink<R>: Send + Sync {
    fn on_changes(&self, changes: &[Change<R>]);
}

impl<R, F> ChangeSink<R> for F
where
    F: Fn(&[Change<R>]) + Send + Sync,
{
    fn on_changes(&self, changes: &[Change<R>]) {
        self(changes)
    }
}
