//! Scoutsync Service - observer dispatch for echo-suppressing sync.
//!
//! Hosts one [`scoutsync_engine::SyncEngine`] per record type. Downloader and
//! uploader collaborators report events through a [`SyncHandle`]; each
//! record type's [`Dispatcher`] delivers them to its engine in arrival order,
//! and reconciled changes reach subscribers as [`ChangeNotice`]s.
//!
//! The service installs no tracing subscriber; binaries embedding it choose
//! their own.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod notify;
pub mod service;

pub use config::{Config, ConfigError};
pub use dispatch::{ChangeNotice, Dispatcher, SyncEvent, SyncHandle};
pub use error::{Result, ServiceError};
pub use notify::SubscriberManager;
pub use service::SyncService;
