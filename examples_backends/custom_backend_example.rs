use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use ndjson_batch_sink::{
    engine::{BatchEngine, EngineConfig},
    init::init_tracing,
    sink::{SinkError, StorageSink},
};
use tracing::info;

/// Example of integrating a completely custom backend by implementing
/// the `StorageSink` trait directly. Imagine this uploads to some
/// proprietary blob store for which this crate does not provide a
/// built-in sink.
struct MyBlobStoreSink;

#[async_trait]
impl StorageSink for MyBlobStoreSink {
    async fn write(&self, key: &str, blob: Bytes) -> Result<(), SinkError> {
        // Here you would call your own client library for the target store.
        // For the sake of example we just print the object.
        println!("[my-blob-store] {} ({} bytes)", key, blob.len());
        print!("{}", String::from_utf8_lossy(&blob));
        Ok(())
    }

    fn describe(&self) -> String {
        "my-blob-store".to_string()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("info")?;

    let sink: Arc<dyn StorageSink> = Arc::new(MyBlobStoreSink);
    let engine = BatchEngine::start(sink, EngineConfig { buffer_limit: 3, ..EngineConfig::default() });

    info!("custom backend example started");
    for id in 1..=7 {
        engine.add_record(serde_json::json!({ "id": id }))?;
    }

    engine.shutdown().await?;
    Ok(())
}
