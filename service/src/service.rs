//! Hosts one engine and dispatcher per configured record type.

use std::collections::HashMap;
use std::sync::Arc;

use scoutsync_engine::{CollectionName, EngineStats, Record, SyncEngine};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::dispatch::{ChangeNotice, Dispatcher, SyncHandle};
use crate::error::{Result, ServiceError};
use crate::notify::SubscriberManager;

/// One engine per record type, all feeding a shared subscriber registry.
///
/// Engines are independent: their ledgers never share a lock.
pub struct SyncService {
    engines: HashMap<CollectionName, Arc<SyncEngine<Record>>>,
    handles: HashMap<CollectionName, SyncHandle<Record>>,
    subscribers: Arc<SubscriberManager<Record>>,
    tasks: Vec<JoinHandle<()>>,
}

impl SyncService {
    /// Validate the configuration and spawn a dispatcher per record type.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &Config) -> Result<Self> {
        let engine_config = config.engine_config();
        engine_config.validate()?;

        let subscribers = SubscriberManager::new_shared();
        let mut engines = HashMap::new();
        let mut handles = HashMap::new();
        let mut tasks = Vec::with_capacity(config.collections.len());

        for collection in &config.collections {
            let engine = Arc::new(SyncEngine::new(engine_config.clone())?);
            let (dispatcher, handle) =
                Dispatcher::new(collection.clone(), Arc::clone(&engine), Arc::clone(&subscribers));

            tasks.push(tokio::spawn(dispatcher.run()));
            engines.insert(collection.clone(), engine);
            handles.insert(collection.clone(), handle);
        }

        tracing::info!(
            collections = ?config.collections,
            retention_secs = config.retention_secs,
            poll_interval_secs = config.poll_interval_secs,
            "sync service started"
        );

        Ok(Self {
            engines,
            handles,
            subscribers,
            tasks,
        })
    }

    /// The handle collaborators use to report events for `collection`.
    pub fn handle(&self, collection: &str) -> Result<SyncHandle<Record>> {
        self.handles
            .get(collection)
            .cloned()
            .ok_or_else(|| ServiceError::UnknownCollection(collection.to_string()))
    }

    /// Subscribe to net changes from every record type.
    ///
    /// Returns the subscriber ID and the receiving end.
    pub fn subscribe(&self) -> (String, mpsc::UnboundedReceiver<ChangeNotice<Record>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.subscribers.register(tx);
        (id, rx)
    }

    pub fn unsubscribe(&self, id: &str) -> bool {
        self.subscribers.unregister(id)
    }

    /// Ledger sizes for one record type.
    pub fn stats(&self, collection: &str) -> Result<EngineStats> {
        self.engines
            .get(collection)
            .map(|engine| engine.stats())
            .ok_or_else(|| ServiceError::UnknownCollection(collection.to_string()))
    }

    /// Record types this service hosts.
    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(String::as_str)
    }

    /// Stop accepting events and wait for every dispatcher to drain.
    ///
    /// Handles cloned out of the service keep their dispatcher alive until
    /// they are dropped too.
    pub async fn shutdown(self) {
        let Self { handles, tasks, .. } = self;
        drop(handles);

        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!("dispatcher task failed: {}", e);
            }
        }

        tracing::info!("sync service stopped");
    }
}
