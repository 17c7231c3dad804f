//! Parallel evaluation of per-record decisions.
//!
//! Each fetched record's verdict depends only on read-only ledger snapshots
//! and the record itself, so a batch can be split into chunks and evaluated
//! on scoped worker threads. Chunks are joined in order, so the output lines
//! up index for index with the input.

use std::thread;

/// Fans a batch out over a bounded number of scoped threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchEvaluator {
    workers: usize,
    chunk_size: usize,
}

impl BatchEvaluator {
    pub fn new(workers: usize, chunk_size: usize) -> Self {
        Self {
            workers: workers.max(1),
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Apply `decide` to every item and collect the results in input order.
    ///
    /// Small batches run inline; larger ones are split into at most
    /// `workers` chunks of at least `chunk_size` items each. A panic in a
    /// worker is propagated to the caller.
    pub fn evaluate<T, V, F>(&self, items: &[T], decide: F) -> Vec<V>
    where
        T: Sync,
        V: Send,
        F: Fn(&T) -> V + Sync,
    {
        if self.workers == 1 || items.len() <= self.chunk_size {
            return items.iter().map(&decide).collect();
        }

        let per_worker = items.len().div_ceil(self.workers).max(self.chunk_size);
        let decide = &decide;

        thread::scope(|scope| {
            let handles: Vec<_> = items
                .chunks(per_worker)
                .map(|chunk| scope.spawn(move || chunk.iter().map(decide).collect::<Vec<V>>()))
                .collect();

            let mut verdicts = Vec::with_capacity(items.len());
            for handle in handles {
                match handle.join() {
                    Ok(chunk) => verdicts.extend(chunk),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            verdicts
        })
    }
}
