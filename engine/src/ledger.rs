//! Ordered completion ledger.
//!
//! A ledger records recently completed local operations of one kind, most
//! recent first. Both questions the engine asks of it are recency-biased:
//! pruning drops the tail, and echo lookups only care about the hot prefix.
//!
//! # Invariants
//!
//! - Entries are sorted by `completed_at`, descending, after every insertion.
//!   Entries with equal timestamps keep insertion order reversed (newest
//!   insert first).
//! - Duplicate identities are allowed. The first entry for an identity is the
//!   authoritative one; later entries are kept until pruned.

use crate::{OperationCompletion, RecordId, SyncRecord, Timestamp};
use std::collections::{HashMap, HashSet};

/// Sorted sequence of operation completions, most recent first.
#[derive(Debug, Clone)]
pub struct Ledger<R> {
    entries: Vec<OperationCompletion<R>>,
    /// Identities reconciled against a fetch; dropped by the next prune.
    confirmed: HashSet<RecordId>,
}

impl<R> Default for Ledger<R> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            confirmed: HashSet::new(),
        }
    }
}

impl<R: SyncRecord> Ledger<R> {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a completion, keeping descending timestamp order.
    ///
    /// Locating the slot is a binary search; the insert itself shifts the
    /// older tail. A fresh completion for a confirmed identity revokes the
    /// confirmation.
    pub fn insert(&mut self, completion: OperationCompletion<R>) {
        let at = completion.completed_at();
        let index = self.entries.partition_point(|e| e.completed_at() > at);
        self.confirmed.remove(completion.record_id());
        self.entries.insert(index, completion);
    }

    /// Remove every entry with `completed_at < older_than`, plus every entry
    /// whose identity was confirmed since the previous prune.
    ///
    /// Returns the number of entries removed. Pruning twice with no
    /// intervening insert or confirm leaves the ledger unchanged the second
    /// time.
    pub fn prune(&mut self, older_than: Timestamp) -> usize {
        let before = self.entries.len();

        let keep = self
            .entries
            .partition_point(|e| e.completed_at() >= older_than);
        self.entries.truncate(keep);

        if !self.confirmed.is_empty() {
            let confirmed = std::mem::take(&mut self.confirmed);
            self.entries
                .retain(|e| !confirmed.contains(e.record_id()));
        }

        before - self.entries.len()
    }

    /// The latest entry for an identity, if any.
    pub fn most_recent_entry(&self, id: &str) -> Option<&OperationCompletion<R>> {
        self.entries.iter().find(|e| e.record_id() == id)
    }

    /// Identity -> most recent `completed_at`, for entries no older than
    /// `since`.
    ///
    /// Walks only the prefix of the ledger that falls inside the window.
    pub fn live_index(&self, since: Timestamp) -> HashMap<RecordId, Timestamp> {
        let mut index = HashMap::new();
        for entry in self.entries.iter().take_while(|e| e.completed_at() >= since) {
            index
                .entry(entry.record_id().to_string())
                .or_insert(entry.completed_at());
        }
        index
    }

    /// Mark an identity as reconciled. Returns `false` if the ledger holds no
    /// entry for it or it is already confirmed.
    pub fn confirm(&mut self, id: &str) -> bool {
        if self.confirmed.contains(id) || self.most_recent_entry(id).is_none() {
            return false;
        }
        self.confirmed.insert(id.to_string())
    }

    /// Confirm every identity in the ledger that is not in `present`.
    ///
    /// Returns the identities confirmed by this call.
    pub fn confirm_absent(&mut self, present: &HashSet<&str>) -> Vec<RecordId> {
        let mut seen = HashSet::new();
        let mut newly = Vec::new();
        for entry in &self.entries {
            let id = entry.record_id();
            if present.contains(id) || self.confirmed.contains(id) || !seen.insert(id) {
                continue;
            }
            newly.push(id.to_string());
        }
        self.confirmed.extend(newly.iter().cloned());
        newly
    }

    /// Entries, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &OperationCompletion<R>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check the descending-order invariant.
    pub fn is_ordered(&self) -> bool {
        self.entries
            .windows(2)
            .all(|w| w[0].completed_at() >= w[1].completed_at())
    }

    /// Discard every entry and confirmation.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.confirmed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OperationKind, Record};
    use serde_json::json;

    fn completion(id: &str, at: Timestamp) -> OperationCompletion<Record> {
        OperationCompletion::new(
            Record::new(id, "treatments", at, json!({})),
            at,
            OperationKind::Uploaded,
        )
    }

    fn ids(ledger: &Ledger<Record>) -> Vec<&str> {
        ledger.iter().map(|e| e.record_id()).collect()
    }

    #[test]
    fn insert_keeps_most_recent_first() {
        let mut ledger = Ledger::new();
        ledger.insert(completion("a", 10));
        ledger.insert(completion("b", 30));
        ledger.insert(completion("c", 20));

        assert_eq!(ids(&ledger), vec!["b", "c", "a"]);
        assert!(ledger.is_ordered());
    }

    #[test]
    fn equal_timestamps_put_newest_insert_first() {
        let mut ledger = Ledger::new();
        ledger.insert(completion("a", 10));
        ledger.insert(completion("b", 10));

        assert_eq!(ids(&ledger), vec!["b", "a"]);
    }

    #[test]
    fn duplicates_retained_latest_authoritative() {
        let mut ledger = Ledger::new();
        ledger.insert(completion("a", 10));
        ledger.insert(completion("a", 20));

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.most_recent_entry("a").unwrap().completed_at(), 20);
    }

    #[test]
    fn unknown_identity_is_not_found() {
        let ledger: Ledger<Record> = Ledger::new();
        assert!(ledger.most_recent_entry("ghost").is_none());
    }

    #[test]
    fn prune_trims_tail() {
        let mut ledger = Ledger::new();
        for (id, at) in [("a", 10), ("b", 20), ("c", 30), ("d", 40)] {
            ledger.insert(completion(id, at));
        }

        let removed = ledger.prune(25);

        assert_eq!(removed, 2);
        assert_eq!(ids(&ledger), vec!["d", "c"]);
    }

    #[test]
    fn prune_boundary_is_exclusive() {
        let mut ledger = Ledger::new();
        ledger.insert(completion("a", 25));
        assert_eq!(ledger.prune(25), 0);
        assert_eq!(ledger.prune(26), 1);
    }

    #[test]
    fn live_index_uses_window_and_latest_entry() {
        let mut ledger = Ledger::new();
        ledger.insert(completion("a", 10));
        ledger.insert(completion("b", 20));
        ledger.insert(completion("a", 30));

        let index = ledger.live_index(15);
        assert_eq!(index.len(), 2);
        assert_eq!(index["a"], 30);
        assert_eq!(index["b"], 20);
    }

    #[test]
    fn confirmed_entries_dropped_by_next_prune() {
        let mut ledger = Ledger::new();
        ledger.insert(completion("a", 100));
        ledger.insert(completion("b", 100));

        assert!(ledger.confirm("a"));
        assert!(!ledger.confirm("a"));
        assert!(!ledger.confirm("ghost"));

        ledger.prune(0);
        assert_eq!(ids(&ledger), vec!["b"]);
        assert!(!ledger.confirm("a"));
    }

    #[test]
    fn insert_revokes_confirmation() {
        let mut ledger = Ledger::new();
        ledger.insert(completion("a", 100));
        ledger.confirm("a");
        ledger.insert(completion("a", 200));

        ledger.prune(0);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn confirm_absent_skips_present_and_dedups() {
        let mut ledger = Ledger::new();
        ledger.insert(completion("a", 10));
        ledger.insert(completion("a", 20));
        ledger.insert(completion("b", 30));

        let present: HashSet<&str> = ["b"].into_iter().collect();
        let confirmed = ledger.confirm_absent(&present);

        assert_eq!(confirmed, vec!["a".to_string()]);
        assert!(ledger.confirm_absent(&present).is_empty());
    }

    #[test]
    fn clear_empties_everything() {
        let mut ledger = Ledger::new();
        ledger.insert(completion("a", 10));
        ledger.confirm("a");
        ledger.clear();
        assert!(ledger.is_empty());

        ledger.insert(completion("a", 20));
        assert!(ledger.confirm("a"));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_insert_keeps_order(stamps in proptest::collection::vec(0u64..1_000, 0..64)) {
                let mut ledger = Ledger::new();
                for (i, at) in stamps.iter().enumerate() {
                    ledger.insert(completion(&format!("r{}", i % 7), *at));
                    prop_assert!(ledger.is_ordered());
                }
                prop_assert_eq!(ledger.len(), stamps.len());
            }

            #[test]
            fn prop_prune_is_idempotent(
                stamps in proptest::collection::vec(0u64..1_000, 0..64),
                cutoff in 0u64..1_000,
                confirm in proptest::collection::vec(0usize..7, 0..4),
            ) {
                let mut ledger = Ledger::new();
                for (i, at) in stamps.iter().enumerate() {
                    ledger.insert(completion(&format!("r{}", i % 7), *at));
                }
                for n in confirm {
                    ledger.confirm(&format!("r{}", n));
                }

                ledger.prune(cutoff);
                let once: Vec<(String, Timestamp)> = ledger
                    .iter()
                    .map(|e| (e.record_id().to_string(), e.completed_at()))
                    .collect();

                ledger.prune(cutoff);
                let twice: Vec<(String, Timestamp)> = ledger
                    .iter()
                    .map(|e| (e.record_id().to_string(), e.completed_at()))
                    .collect();

                prop_assert_eq!(once, twice);
                prop_assert!(ledger.iter().all(|e| e.completed_at() >= cutoff));
            }
        }
    }
}
