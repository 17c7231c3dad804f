//! Configuration management for the sync service.

use scoutsync_engine::{EngineConfig, DEFAULT_CHUNK_SIZE};
use std::env;

/// Record types synced when `SCOUTSYNC_COLLECTIONS` is unset.
pub const DEFAULT_COLLECTIONS: &[&str] = &["treatments", "profile", "entries"];

/// Default downloader cadence, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// How long ledger entries are kept (required, no default)
    pub retention_secs: u64,
    /// Expected interval between downloader polls
    pub poll_interval_secs: u64,
    /// Worker threads per fetch evaluation
    pub eval_workers: usize,
    /// Minimum records per evaluation worker
    pub eval_chunk_size: usize,
    /// Record types to host an engine for
    pub collections: Vec<String>,
}

impl Config {
    /// Load configuration from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let retention_secs = lookup("SCOUTSYNC_RETENTION_SECS")
            .ok_or(ConfigError::MissingRetention)
            .and_then(|v| parse("SCOUTSYNC_RETENTION_SECS", v))?;

        let poll_interval_secs = match lookup("SCOUTSYNC_POLL_INTERVAL_SECS") {
            Some(v) => parse("SCOUTSYNC_POLL_INTERVAL_SECS", v)?,
            None => DEFAULT_POLL_INTERVAL_SECS,
        };

        let eval_workers = match lookup("SCOUTSYNC_EVAL_WORKERS") {
            Some(v) => parse("SCOUTSYNC_EVAL_WORKERS", v)?,
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        };

        let eval_chunk_size = match lookup("SCOUTSYNC_EVAL_CHUNK") {
            Some(v) => parse("SCOUTSYNC_EVAL_CHUNK", v)?,
            None => DEFAULT_CHUNK_SIZE,
        };

        let collections: Vec<String> = match lookup("SCOUTSYNC_COLLECTIONS") {
            Some(v) => v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            None => DEFAULT_COLLECTIONS.iter().map(|s| s.to_string()).collect(),
        };
        if collections.is_empty() {
            return Err(ConfigError::NoCollections);
        }

        Ok(Self {
            retention_secs,
            poll_interval_secs,
            eval_workers,
            eval_chunk_size,
            collections,
        })
    }

    /// Engine settings shared by every hosted record type.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(
            self.retention_secs.saturating_mul(1000),
            self.poll_interval_secs.saturating_mul(1000),
        )
        .with_workers(self.eval_workers)
        .with_chunk_size(self.eval_chunk_size)
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value })
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("SCOUTSYNC_RETENTION_SECS environment variable is required")]
    MissingRetention,

    #[error("invalid {var} value: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("SCOUTSYNC_COLLECTIONS names no record types")]
    NoCollections,
}
