//! Long-lived streams to the control plane.
//!
//! All three streams share one skeleton, [`StreamScope`]: a cancellation
//! token, one background task per direction, and a latched terminal error.
//!
//! - [`Watcher`]: the change feed, decoded into [`Event`](crate::events::Event)s
//! - [`KeepAliver`]: lease heartbeats
//! - [`AuditStream`]: session recordings
//!
//! Every handle exposes the same lifecycle:
//!
//! | Method      | Meaning                                              |
//! |-------------|------------------------------------------------------|
//! | `done()`    | resolves once the stream is closed, for any reason   |
//! | `error()`   | the error that closed it; `None` after `close()`     |
//! | `close()`   | closes the stream; idempotent                        |
//!
//! Dropping a handle closes its stream. Streams never reconnect; open a new
//! one after a failure.

mod audit;
mod keep_aliver;
mod scope;
mod watcher;

pub use audit::{AuditStream, CLOSE_FLUSH_TIMEOUT, StatusReceiver};
pub use keep_aliver::{KeepAliveSender, KeepAliver};
pub use scope::StreamScope;
pub use watcher::{WatchFilter, WatchKind, Watcher};
