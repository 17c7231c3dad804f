//! Error types for the scoutsync engine.
//!
//! Reconciliation itself never fails: it only transforms in-memory ledgers.
//! The only errors the engine reports are configuration problems caught at
//! construction time.

use crate::Millis;
use thiserror::Error;

/// All possible errors from the scoutsync engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(
        "retention window of {retention}ms is too short for a poll interval of {poll_interval}ms \
         (need at least {minimum}ms)"
    )]
    RetentionTooShort {
        retention: Millis,
        poll_interval: Millis,
        minimum: Millis,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
