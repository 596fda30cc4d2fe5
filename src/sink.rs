use async_trait::async_trait;
use bytes::Bytes;
use std::error::Error;

/// Error returned by [`StorageSink`] implementations.
pub type SinkError = Box<dyn Error + Send + Sync>;

/// Durable destination for finished NDJSON batches.
///
/// Implementations transport one blob to a concrete backend (local
/// directory, S3, ...). The engine calls `write` from a flush task, never
/// from a producer, and never while holding the buffer lock.
#[async_trait]
pub trait StorageSink: Send + Sync {
    /// Store `blob` under `key`.
    ///
    /// **Parameters**
    /// - `key`: partition key relative to the sink's prefix, e.g.
    ///   `2024/03/07/05/<uuid>.json`.
    /// - `blob`: the encoded batch, one JSON value per line.
    ///
    /// **Returns**
    /// - `Ok(())` once the backend has accepted the whole object.
    /// - `Err(..)` on any I/O or service failure. The engine retries the
    ///   same key with backoff and requeues the batch if every attempt fails,
    ///   so writing the same key twice must be safe.
    async fn write(&self, key: &str, blob: Bytes) -> Result<(), SinkError>;

    /// Short human-readable description of the destination, used in logs.
    fn describe(&self) -> String {
        "storage sink".to_string()
    }
}
