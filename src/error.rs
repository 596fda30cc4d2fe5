use crate::sink::SinkError;

/// Errors surfaced by [`BatchEngine`](crate::engine::BatchEngine).
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// The engine has begun shutting down and no longer accepts records.
    #[error("batch engine is stopped")]
    Stopped,

    /// Writing a batch failed on every attempt. The batch has been put back
    /// at the front of the buffer and will be retried by the next flush.
    #[error("failed to write {records} records to {key}: {source}")]
    Storage {
        key: String,
        records: usize,
        #[source]
        source: SinkError,
    },

    /// A batch could not be encoded as NDJSON. Its records are requeued.
    #[error("failed to encode {records} records: {source}")]
    Encode {
        records: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Error type returned when parsing a storage prefix.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PrefixError {
    #[error("storage prefix is empty")]
    Empty,

    #[error("object store prefix `{0}` has no bucket")]
    MissingBucket(String),
}

/// Error type returned when building a storage sink from configuration.
#[derive(thiserror::Error, Debug)]
pub enum BackendBuildError {
    #[error("s3 feature is not enabled")]
    S3FeatureDisabled,

    #[error("failed to create object store client: {0}")]
    ObjectStore(#[from] object_store::Error),
}

/// Error type returned when loading [`ServiceConfig`](crate::config::ServiceConfig).
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid bind address `{value}`: {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("invalid partition clock `{0}`, expected `local` or `utc`")]
    InvalidPartitionClock(String),
}
