//! Tracing subscriber setup shared by the binary and integration tests.

/// Subscriber initialisation.
pub mod tracing;

pub use crate::tracing::{LogConfig, LogFormat, init};
