//! Integration tests for the accessplane client.
//!
//! The tests drive real client streams against the in-memory
//! [`MockTransport`](accessplane::testing::MockTransport); each test plays
//! the control plane's side of the calls through the transport's peers.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test --test integration
//!
//! # With client logs
//! RUST_LOG=accessplane=debug cargo test --test integration -- --nocapture
//! ```

mod audit_tests;
mod common;
mod keep_alive_tests;
mod marshal_tests;
mod watch_tests;
