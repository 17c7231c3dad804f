//! Event dispatch loop for one record type.

use std::sync::Arc;

use scoutsync_engine::{
    Clock, CollectionName, DownloaderObserver, FetchedBatch, SyncEngine, SyncRecord, SystemClock,
    Timestamp, UploaderObserver,
};
use tokio::sync::mpsc;

use crate::error::{Result, ServiceError};
use crate::notify::{manager::NoticeSink, SubscriberManager};

use super::SyncEvent;

/// Cloneable entry point used by downloader and uploader collaborators.
///
/// Each call delivers exactly one event. An uploader must only call the
/// completion methods for operations the remote store accepted.
#[derive(Debug)]
pub struct SyncHandle<R> {
    collection: CollectionName,
    sender: mpsc::UnboundedSender<SyncEvent<R>>,
}

impl<R> Clone for SyncHandle<R> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            sender: self.sender.clone(),
        }
    }
}

impl<R> SyncHandle<R> {
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Report a fetched batch, reference time taken at delivery.
    pub fn fetched(&self, records: Vec<R>) -> Result<()> {
        self.send(SyncEvent::Fetched {
            records,
            reference_time: None,
        })
    }

    /// Report a fetched batch with an explicit reference time.
    pub fn fetched_at(&self, records: Vec<R>, reference_time: Timestamp) -> Result<()> {
        self.send(SyncEvent::Fetched {
            records,
            reference_time: Some(reference_time),
        })
    }

    /// Report records the remote store accepted as new.
    pub fn uploaded(&self, records: Vec<R>) -> Result<()> {
        self.send(SyncEvent::Uploaded { records })
    }

    /// Report records the remote store accepted as updated.
    pub fn updated(&self, records: Vec<R>) -> Result<()> {
        self.send(SyncEvent::Updated { records })
    }

    /// Report records the remote store deleted.
    pub fn deleted(&self, records: Vec<R>) -> Result<()> {
        self.send(SyncEvent::Deleted { records })
    }

    fn send(&self, event: SyncEvent<R>) -> Result<()> {
        self.sender
            .send(event)
            .map_err(|_| ServiceError::Closed(self.collection.clone()))
    }
}

/// Consumes collaborator events for one record type and drives its engine.
pub struct Dispatcher<R, C = SystemClock> {
    collection: CollectionName,
    engine: Arc<SyncEngine<R, C>>,
    events: mpsc::UnboundedReceiver<SyncEvent<R>>,
}

impl<R: SyncRecord, C: Clock + 'static> Dispatcher<R, C> {
    /// Create a dispatcher and the handle collaborators use to reach it.
    ///
    /// The engine's net changes are published to `subscribers` tagged with
    /// `collection`.
    pub fn new(
        collection: impl Into<CollectionName>,
        engine: Arc<SyncEngine<R, C>>,
        subscribers: Arc<SubscriberManager<R>>,
    ) -> (Self, SyncHandle<R>) {
        let collection = collection.into();
        let (sender, events) = mpsc::unbounded_channel();

        engine.subscribe(Arc::new(NoticeSink {
            collection: collection.clone(),
            subscribers,
        }));

        let handle = SyncHandle {
            collection: collection.clone(),
            sender,
        };
        let dispatcher = Self {
            collection,
            engine,
            events,
        };

        (dispatcher, handle)
    }

    pub fn engine(&self) -> &Arc<SyncEngine<R, C>> {
        &self.engine
    }

    /// Deliver events until every handle has been dropped.
    ///
    /// Events are handled one at a time in arrival order. Fetch
    /// reconciliation runs on the blocking pool because the evaluator may
    /// occupy several threads.
    pub async fn run(mut self) {
        tracing::info!(collection = %self.collection, "dispatcher started");

        while let Some(event) = self.events.recv().await {
            let kind = event.kind();
            tracing::trace!(collection = %self.collection, event = kind, "delivering event");

            match event {
                SyncEvent::Fetched {
                    records,
                    reference_time,
                } => {
                    let batch = FetchedBatch {
                        records,
                        reference_time,
                    };
                    let engine = Arc::clone(&self.engine);
                    if let Err(e) =
                        tokio::task::spawn_blocking(move || engine.did_fetch(batch)).await
                    {
                        tracing::error!(
                            collection = %self.collection,
                            "fetch reconciliation failed: {}",
                            e
                        );
                    }
                }
                SyncEvent::Uploaded { records } => self.engine.did_upload(records),
                SyncEvent::Updated { records } => self.engine.did_update(records),
                SyncEvent::Deleted { records } => self.engine.did_delete(records),
            }
        }

        tracing::info!(
            collection = %self.collection,
            stats = ?self.engine.stats(),
            "dispatcher stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::ChangeNotice;
    use scoutsync_engine::{Change, EngineConfig, ManualClock, Record};
    use serde_json::json;

    fn profile(id: &str, touched_at: Timestamp) -> Record {
        Record::new(id, "profile", touched_at, json!({"defaultProfile": "Default"}))
    }

    fn setup() -> (
        Dispatcher<Record, Arc<ManualClock>>,
        SyncHandle<Record>,
        mpsc::UnboundedReceiver<ChangeNotice<Record>>,
    ) {
        let clock = Arc::new(ManualClock::new(1_000));
        let config = EngineConfig::new(60_000, 10_000).with_workers(1);
        let engine = Arc::new(SyncEngine::with_clock(config, clock).unwrap());

        let subscribers = SubscriberManager::new_shared();
        let (tx, rx) = mpsc::unbounded_channel();
        subscribers.register(tx);

        let (dispatcher, handle) = Dispatcher::new("profile", engine, subscribers);
        (dispatcher, handle, rx)
    }

    #[tokio::test]
    async fn events_reach_engine_in_order() {
        let (dispatcher, handle, mut rx) = setup();
        let engine = Arc::clone(dispatcher.engine());
        let task = tokio::spawn(dispatcher.run());

        handle.uploaded(vec![profile("mine", 1)]).unwrap();
        handle
            .fetched_at(vec![profile("mine", 1), profile("theirs", 1)], 2_000)
            .unwrap();
        drop(handle);
        task.await.unwrap();

        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.collection, "profile");
        assert!(matches!(notice.change, Change::Created(ref r) if r.id == "theirs"));
        assert!(rx.try_recv().is_err());
        assert_eq!(engine.stats().known, 2);
    }

    #[tokio::test]
    async fn handle_reports_closed_dispatcher() {
        let (dispatcher, handle, _rx) = setup();
        drop(dispatcher);

        let err = handle.deleted(vec![profile("p", 1)]).unwrap_err();
        assert!(matches!(err, ServiceError::Closed(ref c) if c == "profile"));
    }
}
