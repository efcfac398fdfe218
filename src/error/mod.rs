//! Error types for the access-plane client.
//!
//! Every fallible operation returns [`Error`], categorized by [`ErrorKind`]:
//!
//! - **connection** errors are transport-level; the caller may reconnect
//! - **validation** errors mean a malformed or non-conforming resource
//! - **unsupported version / resource** errors are compatibility mismatches,
//!   fatal to the call but not to the process
//! - **stream closed** is terminal and informational
//!
//! ## Key Invariant
//!
//! Streams have no synchronous path for receive-side failures. After a
//! stream's `done()` fires, `error()` returns `None` for a close the caller
//! initiated and `Some(err)` for a failure.
//!
//! ```rust,ignore
//! watcher.done().await;
//! match watcher.error() {
//!     None => println!("closed by us"),
//!     Some(err) => println!("watch failed: {}", err),
//! }
//! ```

#[allow(clippy::module_inception)]
mod error;
mod kind;

pub use error::Error;
pub use kind::ErrorKind;

/// A specialized `Result` type for access-plane client operations.
pub type Result<T> = std::result::Result<T, Error>;
