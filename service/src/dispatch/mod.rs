//! Observer dispatch.
//!
//! Downloader and uploader collaborators push [`SyncEvent`]s through a
//! [`SyncHandle`]. A [`Dispatcher`] consumes them in arrival order and drives
//! its engine; reconciled changes leave as [`ChangeNotice`]s.

mod dispatcher;
mod protocol;

pub use dispatcher::{Dispatcher, SyncHandle};
pub use protocol::*;
