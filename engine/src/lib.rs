//! # Scoutsync Engine
//!
//! Echo-suppressing reconciliation for records mirrored from a polled remote
//! store.
//!
//! A remote record store is reachable through two independent channels: a
//! downloader that periodically fetches the full remote record set, and an
//! uploader that issues create/update/delete requests. The downloader's next
//! poll routinely returns records this same process just changed. The engine
//! recognises those echoes and produces one consistent stream of
//! created/updated/deleted notifications.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine never touches the network or disk
//! - **Infallible reconciliation**: only configuration can fail
//! - **Independent ledgers**: each guarded separately, never two held at once
//! - **Generic**: one implementation, instantiated per record type
//!
//! ## Core Concepts
//!
//! ### Ledgers
//!
//! A [`Ledger`] holds recently completed local operations of one
//! [`OperationKind`], most recent first. Each ledger lives behind its own
//! [`Guarded`] mutex.
//!
//! ### Reconciliation
//!
//! [`SyncEngine::reconcile_fetch`] filters a [`FetchedBatch`] against the
//! ledgers with precedence delete > upload > update, using a
//! [`BatchEvaluator`] to judge records in parallel.
//!
//! ### Observers
//!
//! [`SyncEngine`] implements [`DownloaderObserver`] and [`UploaderObserver`]
//! and forwards net [`Change`]s to registered [`ChangeSink`]s.
//!
//! ## Quick Start
//!
//! ```rust
//! use scoutsync_engine::{EngineConfig, FetchedBatch, ManualClock, Record, SyncEngine, Verdict};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let clock = Arc::new(ManualClock::new(100));
//! let config = EngineConfig::new(60_000, 5_000);
//! let engine = SyncEngine::with_clock(config, Arc::clone(&clock)).unwrap();
//!
//! // The uploader created "x"...
//! engine.record_uploaded([Record::new("x", "treatments", 100, json!({}))]);
//!
//! // ...and the next poll returns it.
//! clock.set(105);
//! let outcome = engine.reconcile_fetch(FetchedBatch::at(
//!     vec![Record::new("x", "treatments", 105, json!({}))],
//!     105,
//! ));
//!
//! assert_eq!(outcome.suppression("x"), Some(Verdict::UploadEcho));
//! assert!(outcome.is_present("x"));
//! assert!(outcome.changes.is_empty());
//! ```

pub mod clock;
pub mod completion;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod guard;
pub mod ledger;
pub mod observer;
pub mod reconcile;
pub mod record;

// Re-export main types at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use completion::{OperationCompletion, OperationKind};
pub use config::{EngineConfig, DEFAULT_CHUNK_SIZE, MIN_RETENTION_FACTOR};
pub use error::Error;
pub use evaluator::BatchEvaluator;
pub use guard::Guarded;
pub use ledger::Ledger;
pub use observer::{ChangeSink, Change, DownloaderObserver, FetchedBatch, UploaderObserver};
pub use reconcile::{EngineStats, FetchOutcome, Suppressed, SyncEngine, Verdict};
pub use record::{Record, SyncRecord};

/// Type aliases for clarity
pub type RecordId = String;
pub type CollectionName = String;
pub type Timestamp = u64;
pub type Millis = u64;
