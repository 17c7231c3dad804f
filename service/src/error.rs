//! Unified error handling for the sync service.

use crate::config::ConfigError;
use scoutsync_engine::CollectionName;

/// Service error type.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Engine error: {0}")]
    Engine(#[from] scoutsync_engine::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("No engine hosted for record type: {0}")]
    UnknownCollection(CollectionName),

    #[error("Dispatcher for {0} has stopped")]
    Closed(CollectionName),
}

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
