//! Downstream change notification.
//!
//! Subscribers receive every net change reconciled by any hosted engine,
//! tagged with the record type it belongs to.

pub(crate) mod manager;

pub use manager::{NoticeSender, SubscriberManager};
