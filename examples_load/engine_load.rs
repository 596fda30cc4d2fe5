use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;

use ndjson_batch_sink::engine::{BatchEngine, EngineConfig};
use ndjson_batch_sink::init::init_tracing;
use ndjson_batch_sink::noop_sink::NoopSink;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("warn")?;

    let config = EngineConfig {
        buffer_limit: 1_000,
        flush_interval: Duration::from_secs(1),
        ..EngineConfig::default()
    };
    let engine = BatchEngine::start(Arc::new(NoopSink), config);

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        engine.add_record(serde_json::json!({"name": "Steve", "iteration": i}))?;
    }

    let elapsed = start.elapsed();
    println!("buffered {} records in {:?} (~{:.0} rec/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    engine.shutdown().await?;
    println!("{:?}", engine.stats());
    Ok(())
}
