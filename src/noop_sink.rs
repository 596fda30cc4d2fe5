use crate::sink::{SinkError, StorageSink};
use async_trait::async_trait;
use bytes::Bytes;

/// A sink that simply drops all batches.
///
/// Useful for measuring the overhead of the engine itself without any
/// storage I/O.
#[derive(Clone, Default)]
pub struct NoopSink;

#[async_trait]
impl StorageSink for NoopSink {
    async fn write(&self, _key: &str, _blob: Bytes) -> Result<(), SinkError> {
        Ok(())
    }

    fn describe(&self) -> String {
        "noop".to_string()
    }
}
