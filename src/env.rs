//! Environment variable names read by the service binary.
//!
//! These are purely helpers; the engine and sinks take explicit
//! configuration and never read the environment themselves.

/// Storage prefix: `s3://bucket/subpath/` or a local directory.
pub const PREFIX_ENV: &str = "PREFIX";

/// Seconds between forced flushes, capped at [`MAX_FLUSH_INTERVAL_SECS`].
pub const FLUSH_INTERVAL_ENV: &str = "FLUSH_INTERVAL";

/// Records per batch and size-trigger threshold.
pub const BUFFER_LIMIT_ENV: &str = "BUFFER_LIMIT";

/// `tracing` filter directive, e.g. `info` or `ndjson_batch_sink=debug`.
pub const LOGLEVEL_ENV: &str = "LOGLEVEL";

/// HTTP listen address.
pub const BIND_ADDR_ENV: &str = "BIND_ADDR";

/// `local` or `utc`.
pub const PARTITION_CLOCK_ENV: &str = "PARTITION_CLOCK";

pub const DEFAULT_PREFIX: &str = "/tmp/";
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 120;
pub const MAX_FLUSH_INTERVAL_SECS: u64 = 900;
pub const DEFAULT_BUFFER_LIMIT: usize = 100;
pub const DEFAULT_LOGLEVEL: &str = "info";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
