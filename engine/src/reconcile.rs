//! Reconciliation of local operation completions against remote fetches.
//!
//! The downloader's next poll can return records that this process just
//! created, updated or deleted through the uploader. Announcing those as
//! foreign changes would echo the application's own actions back at it. The
//! [`SyncEngine`] remembers recently completed local operations in three
//! ledgers (one per [`OperationKind`]) and filters every fetch against them.
//!
//! # Algorithm
//!
//! For each fetched record, evaluated independently and in parallel:
//!
//! 1. A live entry in the deleted-ledger suppresses the record entirely; it is
//!    not part of the reconciled present-set. A delete followed by a newer
//!    upload or update of the same identity no longer counts.
//! 2. Otherwise a live entry in the uploaded-ledger suppresses the "created"
//!    notification. The record stays present.
//! 3. Otherwise a live entry in the updated-ledger suppresses the "updated"
//!    notification. The record stays present.
//! 4. Otherwise the record is foreign: reported as created when its identity
//!    is unknown, as updated when its touch time moved, and not at all when
//!    nothing changed since the previous fetch.
//!
//! An entry is live when `completed_at >= reference - retention`. After the
//! batch, known identities missing from the fetch are reported deleted unless
//! this process deleted them; deleted-ledger identities missing from the fetch
//! are confirmed and pruned at the end of the following cycle. Every ledger is
//! pruned of entries older than the retention window.

use crate::{
    config::EngineConfig, error::Result, BatchEvaluator, Change, ChangeSink, Clock,
    DownloaderObserver, FetchedBatch, Guarded, Ledger, OperationCompletion, OperationKind,
    RecordId, SyncRecord, SystemClock, Timestamp, UploaderObserver,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Per-record outcome of ledger evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    /// This process deleted the record; the remote copy is stale
    Deleted,
    /// This process created the record
    UploadEcho,
    /// This process updated the record
    UpdateEcho,
    /// Not caused by this process
    Foreign,
}

impl Verdict {
    fn from_kind(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Deleted => Verdict::Deleted,
            OperationKind::Uploaded => Verdict::UploadEcho,
            OperationKind::Updated => Verdict::UpdateEcho,
        }
    }
}

/// A record withheld from downstream notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suppressed {
    pub record_id: RecordId,
    pub verdict: Verdict,
}

/// Result of reconciling one fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutcome<R> {
    /// Reference time the fetch was evaluated against
    pub reference_time: Timestamp,
    /// Records considered present remotely after reconciliation
    pub present: Vec<R>,
    /// Net changes announced downstream
    pub changes: Vec<Change<R>>,
    /// Echoes that were not announced
    pub suppressed: Vec<Suppressed>,
    /// Deleted-ledger identities confirmed absent by this fetch
    pub confirmed_deletes: Vec<RecordId>,
    /// Ledger entries removed by pruning
    pub pruned: usize,
}

impl<R: SyncRecord> FetchOutcome<R> {
    /// Whether a record is in the reconciled present-set.
    pub fn is_present(&self, id: &str) -> bool {
        self.present.iter().any(|r| r.record_id() == id)
    }

    /// The verdict for a suppressed record, if it was suppressed.
    pub fn suppression(&self, id: &str) -> Option<Verdict> {
        self.suppressed
            .iter()
            .find(|s| s.record_id == id)
            .map(|s| s.verdict)
    }

    /// The change reported for a record, if any.
    pub fn change_for(&self, id: &str) -> Option<&Change<R>> {
        self.changes.iter().find(|c| c.record_id() == id)
    }
}

/// Ledger and known-set sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub uploaded: usize,
    pub updated: usize,
    pub deleted: usize,
    pub known: usize,
}

/// Live ledger snapshots for one fetch.
struct LiveIndexes {
    deleted: HashMap<RecordId, Timestamp>,
    uploaded: HashMap<RecordId, Timestamp>,
    updated: HashMap<RecordId, Timestamp>,
}

impl LiveIndexes {
    fn get(&self, kind: OperationKind) -> &HashMap<RecordId, Timestamp> {
        match kind {
            OperationKind::Deleted => &self.deleted,
            OperationKind::Uploaded => &self.uploaded,
            OperationKind::Updated => &self.updated,
        }
    }

    /// Steps 1-4: the first kind in precedence order with a live entry wins.
    ///
    /// A delete older than a live upload or update of the same identity has
    /// been superseded by the re-creation and is skipped. Ties go to the
    /// delete.
    fn verdict(&self, id: &str) -> Verdict {
        let superseded = self.deleted.get(id).is_some_and(|deleted_at| {
            [&self.uploaded, &self.updated]
                .iter()
                .any(|index| index.get(id).is_some_and(|at| at > deleted_at))
        });

        OperationKind::PRECEDENCE
            .iter()
            .filter(|kind| !(superseded && **kind == OperationKind::Deleted))
            .find(|kind| self.get(**kind).contains_key(id))
            .map(|kind| Verdict::from_kind(*kind))
            .unwrap_or(Verdict::Foreign)
    }
}

/// Drop repeated identities from a fetch, keeping the last snapshot of each.
fn latest_per_identity<R: SyncRecord>(records: Vec<R>) -> Vec<R> {
    let total = records.len();
    let mut seen = HashSet::with_capacity(total);
    let mut unique: Vec<R> = records
        .into_iter()
        .rev()
        .filter(|record| seen.insert(record.record_id().to_string()))
        .collect();
    unique.reverse();

    if unique.len() != total {
        tracing::warn!(
            duplicates = total - unique.len(),
            "fetch repeated record identities"
        );
    }
    unique
}

/// Echo-suppressing reconciliation engine for one record type.
///
/// Lives for the lifetime of its subsystem. Ledgers are not persisted: after a
/// restart, operations still in flight may be reported once as foreign.
pub struct SyncEngine<R, C = SystemClock> {
    config: EngineConfig,
    clock: C,
    evaluator: BatchEvaluator,
    uploaded: Guarded<Ledger<R>>,
    updated: Guarded<Ledger<R>>,
    deleted: Guarded<Ledger<R>>,
    /// Identity -> touch time, as of the previous fetch
    known: Guarded<HashMap<RecordId, Timestamp>>,
    sinks: Guarded<Vec<Arc<dyn ChangeSink<R>>>>,
}

impl<R: SyncRecord> SyncEngine<R, SystemClock> {
    /// Create an engine stamped by the system clock.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<R: SyncRecord, C: Clock> SyncEngine<R, C> {
    /// Create an engine with a custom clock.
    pub fn with_clock(config: EngineConfig, clock: C) -> Result<Self> {
        config.validate()?;
        let evaluator = BatchEvaluator::new(config.workers, config.chunk_size);

        Ok(Self {
            config,
            clock,
            evaluator,
            uploaded: Guarded::new(Ledger::new()),
            updated: Guarded::new(Ledger::new()),
            deleted: Guarded::new(Ledger::new()),
            known: Guarded::new(HashMap::new()),
            sinks: Guarded::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a downstream consumer of net changes.
    pub fn subscribe(&self, sink: Arc<dyn ChangeSink<R>>) {
        self.sinks.with(|sinks| sinks.push(sink));
    }

    /// The ledger holding completions of `kind`.
    pub fn ledger(&self, kind: OperationKind) -> &Guarded<Ledger<R>> {
        match kind {
            OperationKind::Uploaded => &self.uploaded,
            OperationKind::Updated => &self.updated,
            OperationKind::Deleted => &self.deleted,
        }
    }

    /// Learn that the uploader created `records`.
    pub fn record_uploaded(&self, records: impl IntoIterator<Item = R>) {
        self.record(OperationKind::Uploaded, records);
    }

    /// Learn that the uploader updated `records`.
    pub fn record_updated(&self, records: impl IntoIterator<Item = R>) {
        self.record(OperationKind::Updated, records);
    }

    /// Learn that the uploader deleted `records`.
    pub fn record_deleted(&self, records: impl IntoIterator<Item = R>) {
        self.record(OperationKind::Deleted, records);
    }

    fn record(&self, kind: OperationKind, records: impl IntoIterator<Item = R>) {
        let completed_at = self.clock.now();
        let count = self.ledger(kind).with(|ledger| {
            let mut count = 0;
            for record in records {
                ledger.insert(OperationCompletion::new(record, completed_at, kind));
                count += 1;
            }
            count
        });

        tracing::debug!(%kind, count, completed_at, "recorded local completions");
    }

    /// Reconcile a fetched batch against the ledgers and notify subscribers.
    pub fn reconcile_fetch(&self, batch: FetchedBatch<R>) -> FetchOutcome<R> {
        let reference_time = batch.reference_time.unwrap_or_else(|| self.clock.now());
        let since = reference_time.saturating_sub(self.config.retention);
        let records = latest_per_identity(batch.records);

        // One guard at a time; the evaluator only sees the snapshots.
        let live = LiveIndexes {
            deleted: self.deleted.with(|l| l.live_index(since)),
            uploaded: self.uploaded.with(|l| l.live_index(since)),
            updated: self.updated.with(|l| l.live_index(since)),
        };

        // `evaluate` preserves input order, so verdicts line up with records.
        let verdicts = self
            .evaluator
            .evaluate(&records, |record| live.verdict(record.record_id()));

        let fetched: HashSet<&str> = records.iter().map(|r| r.record_id()).collect();
        let mut present = Vec::with_capacity(records.len());
        let mut changes = Vec::new();
        let mut suppressed = Vec::new();

        self.known.with(|known| {
            for (record, verdict) in records.iter().zip(verdicts) {
                let id = record.record_id();
                match verdict {
                    Verdict::Deleted => {
                        known.remove(id);
                        suppressed.push(Suppressed {
                            record_id: id.to_string(),
                            verdict,
                        });
                    }
                    Verdict::UploadEcho | Verdict::UpdateEcho => {
                        known.insert(id.to_string(), record.touched_at());
                        suppressed.push(Suppressed {
                            record_id: id.to_string(),
                            verdict,
                        });
                        present.push(record.clone());
                    }
                    Verdict::Foreign => {
                        match known.insert(id.to_string(), record.touched_at()) {
                            None => changes.push(Change::Created(record.clone())),
                            Some(previous) if previous != record.touched_at() => {
                                changes.push(Change::Updated(record.clone()))
                            }
                            Some(_) => {}
                        }
                        present.push(record.clone());
                    }
                }
            }

            let vanished: Vec<RecordId> = known
                .keys()
                .filter(|id| !fetched.contains(id.as_str()))
                .cloned()
                .collect();
            for id in vanished {
                known.remove(&id);
                if !live.deleted.contains_key(&id) {
                    changes.push(Change::Deleted(id));
                }
            }
        });

        let (pruned_deleted, confirmed_deletes) = self.deleted.with(|l| {
            let pruned = l.prune(since);
            (pruned, l.confirm_absent(&fetched))
        });
        let pruned = pruned_deleted
            + self.uploaded.with(|l| l.prune(since))
            + self.updated.with(|l| l.prune(since));

        tracing::debug!(
            reference_time,
            fetched = records.len(),
            present = present.len(),
            changes = changes.len(),
            suppressed = suppressed.len(),
            confirmed_deletes = confirmed_deletes.len(),
            pruned,
            "reconciled fetch"
        );

        if !changes.is_empty() {
            self.notify(&changes);
        }

        FetchOutcome {
            reference_time,
            present,
            changes,
            suppressed,
            confirmed_deletes,
            pruned,
        }
    }

    fn notify(&self, changes: &[Change<R>]) {
        // Sinks run outside the guard so they may call back into the engine.
        let sinks = self.sinks.snapshot();
        for sink in sinks {
            sink.on_changes(changes);
        }
    }

    /// Current ledger and known-set sizes.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            uploaded: self.uploaded.with(|l| l.len()),
            updated: self.updated.with(|l| l.len()),
            deleted: self.deleted.with(|l| l.len()),
            known: self.known.with(|k| k.len()),
        }
    }

    /// Discard every ledger entry and the known set.
    pub fn reset(&self) {
        for kind in OperationKind::PRECEDENCE {
            self.ledger(kind).with(|l| l.clear());
        }
        self.known.with(|k| k.clear());
        tracing::debug!("engine state reset");
    }
}

impl<R: SyncRecord, C: Clock> DownloaderObserver<R> for SyncEngine<R, C> {
    fn did_fetch(&self, batch: FetchedBatch<R>) {
        self.reconcile_fetch(batch);
    }
}

impl<R: SyncRecord, C: Clock> UploaderObserver<R> for SyncEngine<R, C> {
    fn did_upload(&self, records: Vec<R>) {
        self.record_uploaded(records);
    }

    fn did_update(&self, records: Vec<R>) {
        self.record_updated(records);
    }

    fn did_delete(&self, records: Vec<R>) {
        self.record_deleted(records);
    }
}
