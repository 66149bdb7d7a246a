//! oncall-watch: library crate for integration testing.
//!
//! Re-exports modules needed by integration tests in `tests/`.

pub mod cli;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod metrics;
pub mod server;
pub mod squadcast;
pub mod verifier;
