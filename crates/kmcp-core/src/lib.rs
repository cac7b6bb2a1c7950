//! Low-level utilities shared across kube-mcp crates.
//!
//! Provides time helpers and the size-rotated NDJSON append used by the
//! dispatch audit log.

pub mod ndjson_log;
pub mod time_utils;

pub use ndjson_log::{RotatingNdjsonLog, RotationLimits};
pub use time_utils::{current_unix_timestamp_ms, elapsed_ms};
