//! Engine configuration.
//!
//! The retention window has no default. It must be chosen explicitly and must
//! comfortably exceed the downloader's poll interval, otherwise a genuine echo
//! can outlive its ledger entry and slip through as a foreign change.

use crate::{error::Result, Error, Millis};
use serde::{Deserialize, Serialize};

/// Retention must be at least this many poll intervals.
pub const MIN_RETENTION_FACTOR: u64 = 3;

/// Batches at or below this size are evaluated on the calling thread.
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// Settings for one engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Maximum age of a ledger entry before it is pruned
    pub retention: Millis,
    /// How often the downloader is expected to poll
    pub expected_poll_interval: Millis,
    /// Worker threads used to evaluate a fetched batch
    pub workers: usize,
    /// Minimum number of records handed to one worker
    pub chunk_size: usize,
}

impl EngineConfig {
    /// Create a configuration. Both durations are required.
    pub fn new(retention: Millis, expected_poll_interval: Millis) -> Self {
        Self {
            retention,
            expected_poll_interval,
            workers: default_workers(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// The smallest retention window accepted for the configured poll interval.
    pub fn minimum_retention(&self) -> Millis {
        self.expected_poll_interval
            .saturating_mul(MIN_RETENTION_FACTOR)
    }

    /// Check the configuration before an engine is built from it.
    pub fn validate(&self) -> Result<()> {
        if self.retention == 0 {
            return Err(Error::InvalidConfig("retention must be non-zero".into()));
        }
        if self.expected_poll_interval == 0 {
            return Err(Error::InvalidConfig(
                "expected poll interval must be non-zero".into(),
            ));
        }
        if self.workers == 0 {
            return Err(Error::InvalidConfig("workers must be non-zero".into()));
        }
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk size must be non-zero".into()));
        }

        let minimum = self.minimum_retention();
        if self.retention < minimum {
            return Err(Error::RetentionTooShort {
                retention: self.retention,
                poll_interval: self.expected_poll_interval,
                minimum,
            });
        }

        if self.retention < minimum.saturating_mul(2) {
            tracing::warn!(
                retention_ms = self.retention,
                poll_interval_ms = self.expected_poll_interval,
                "retention window is close to the poll interval; slow polls may leak echoes"
            );
        }

        Ok(())
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
