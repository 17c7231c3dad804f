//! Subscriber registry.
//!
//! Tracks downstream consumers and fans reconciled changes out to them.

use std::sync::Arc;

use dashmap::DashMap;
use scoutsync_engine::{Change, ChangeSink, CollectionName};
use tokio::sync::mpsc;

use crate::dispatch::ChangeNotice;

/// Sender for change notices.
pub type NoticeSender<R> = mpsc::UnboundedSender<ChangeNotice<R>>;

/// Manages downstream subscribers.
///
/// Thread-safe and can be shared across dispatchers via `Arc`.
#[derive(Debug)]
pub struct SubscriberManager<R> {
    /// Active subscribers, keyed by subscriber ID.
    subscribers: DashMap<String, NoticeSender<R>>,
}

impl<R> Default for SubscriberManager<R> {
    fn default() -> Self {
        Self {
            subscribers: DashMap::new(),
        }
    }
}

impl<R: Clone> SubscriberManager<R> {
    /// Create a new subscriber manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new subscriber manager wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a subscriber.
    ///
    /// Returns the subscriber ID.
    pub fn register(&self, sender: NoticeSender<R>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.subscribers.insert(id.clone(), sender);

        tracing::info!(subscriber = %id, "change subscriber registered");

        id
    }

    /// Unregister a subscriber. Returns whether it was registered.
    pub fn unregister(&self, id: &str) -> bool {
        let removed = self.subscribers.remove(id).is_some();
        if removed {
            tracing::info!(subscriber = %id, "change subscriber unregistered");
        }
        removed
    }

    /// Send a notice to every subscriber.
    ///
    /// Subscribers whose receiver was dropped are removed. Returns the number
    /// of subscribers that received the notice.
    pub fn publish(&self, notice: ChangeNotice<R>) -> usize {
        let mut sent_count = 0;
        let mut dead = Vec::new();

        for entry in self.subscribers.iter() {
            if entry.value().send(notice.clone()).is_ok() {
                sent_count += 1;
            } else {
                dead.push(entry.key().clone());
            }
        }

        // Removal must wait until the iterator's shard locks are released.
        for id in dead {
            self.subscribers.remove(&id);
            tracing::debug!(subscriber = %id, "dropped closed change subscriber");
        }

        sent_count
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// Bridges one engine's change stream into the shared subscriber registry.
pub(crate) struct NoticeSink<R> {
    pub(crate) collection: CollectionName,
    pub(crate) subscribers: Arc<SubscriberManager<R>>,
}

impl<R: Clone + Send + Sync> ChangeSink<R> for NoticeSink<R> {
    fn on_changes(&self, changes: &[Change<R>]) {
        let mut delivered = 0;
        for change in changes {
            delivered += self.subscribers.publish(ChangeNotice {
                collection: self.collection.clone(),
                change: change.clone(),
            });
        }

        tracing::debug!(
            collection = %self.collection,
            changes = changes.len(),
            delivered,
            "published changes"
        );
    }
}
