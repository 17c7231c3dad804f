//! Integration tests for the sync service.
//!
//! These drive the service the way downloader and uploader collaborators do,
//! using the system clock.

use scoutsync_engine::{Change, Record};
use scoutsync_service::{Config, ServiceError, SyncService};
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;

fn test_config() -> Config {
    Config {
        retention_secs: 900,
        poll_interval_secs: 60,
        eval_workers: 2,
        eval_chunk_size: 4,
        collections: vec!["treatments".into(), "entries".into()],
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scoutsync_engine=debug,scoutsync_service=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

fn treatment(id: &str, touched_at: u64) -> Record {
    Record::new(id, "treatments", touched_at, json!({"eventType": "Note", "notes": id}))
}

fn entry(id: &str, touched_at: u64) -> Record {
    Record::new(id, "entries", touched_at, json!({"sgv": 110}))
}

#[tokio::test]
async fn test_own_uploads_are_not_announced() {
    init_tracing();
    let service = SyncService::start(&test_config()).unwrap();
    let (_id, mut rx) = service.subscribe();
    let treatments = service.handle("treatments").unwrap();

    treatments.uploaded(vec![treatment("mine", 1)]).unwrap();
    treatments
        .fetched(vec![treatment("mine", 1), treatment("theirs", 1)])
        .unwrap();

    let notice = timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(notice.collection, "treatments");
    assert!(matches!(notice.change, Change::Created(ref r) if r.id == "theirs"));

    drop(treatments);
    service.shutdown().await;
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_record_types_are_independent() {
    init_tracing();
    let service = SyncService::start(&test_config()).unwrap();
    let (_id, mut rx) = service.subscribe();

    let treatments = service.handle("treatments").unwrap();
    let entries = service.handle("entries").unwrap();

    // Same identity, different record types: the upload only covers treatments.
    treatments.uploaded(vec![treatment("shared", 1)]).unwrap();
    entries.fetched(vec![entry("shared", 1)]).unwrap();

    let notice = timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(notice.collection, "entries");
    assert_eq!(notice.change.record_id(), "shared");

    drop((treatments, entries));
    service.shutdown().await;
}

#[tokio::test]
async fn test_own_delete_is_not_announced() {
    init_tracing();
    let service = SyncService::start(&test_config()).unwrap();
    let (_id, mut rx) = service.subscribe();
    let entries = service.handle("entries").unwrap();

    entries.fetched(vec![entry("a", 1), entry("b", 1)]).unwrap();
    entries.deleted(vec![entry("a", 1)]).unwrap();
    // Remote still shows "a" while the delete propagates, then drops it.
    entries.fetched(vec![entry("a", 1), entry("b", 1)]).unwrap();
    entries.fetched(vec![entry("b", 1)]).unwrap();
    drop(entries);
    service.shutdown().await;

    let mut received = Vec::new();
    while let Some(notice) = rx.recv().await {
        received.push(notice.change);
    }

    assert_eq!(received.len(), 2);
    assert!(received.iter().all(|c| matches!(c, Change::Created(_))));
}

#[tokio::test]
async fn test_unknown_collection() {
    let service = SyncService::start(&test_config()).unwrap();

    let err = service.handle("devicestatus").unwrap_err();
    assert!(matches!(err, ServiceError::UnknownCollection(ref c) if c == "devicestatus"));
    assert!(service.stats("devicestatus").is_err());

    let mut collections: Vec<&str> = service.collections().collect();
    collections.sort();
    assert_eq!(collections, vec!["entries", "treatments"]);

    service.shutdown().await;
}

#[tokio::test]
async fn test_rejects_short_retention() {
    let mut config = test_config();
    config.retention_secs = 60;

    let err = SyncService::start(&config).err().unwrap();
    assert!(matches!(err, ServiceError::Engine(_)));
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    let service = SyncService::start(&test_config()).unwrap();
    let (id, mut rx) = service.subscribe();
    assert!(service.unsubscribe(&id));

    let treatments = service.handle("treatments").unwrap();
    treatments.fetched(vec![treatment("x", 1)]).unwrap();
    drop(treatments);
    service.shutdown().await;

    assert!(rx.recv().await.is_none());
}
