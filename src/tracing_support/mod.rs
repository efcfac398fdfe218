//! Tracing integration for observability.
//!
//! The client logs through the `tracing` ecosystem: stream lifecycle
//! (open, terminal error, close), decoding anomalies and codec replacement
//! are emitted as structured events. Install any subscriber to see them.
//!
//! Counters are kept in [`StreamMetrics`], shared by every stream a client
//! opens.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tracing_subscriber::prelude::*;
//!
//! tracing_subscriber::registry()
//!     .with(tracing_subscriber::fmt::layer())
//!     .init();
//!
//! let watcher = client.watcher(&filter).await?;
//! // Logs: opened watch stream kinds=["user", "role"]
//! ```

mod metrics;

pub use metrics::{StreamMetrics, StreamMetricsSnapshot};
