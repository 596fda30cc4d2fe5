//! Load test against a running service: one request, then 5000 concurrent
//! `POST /send` calls with up to 600 in flight.
//!
//! Target URL defaults to `http://127.0.0.1:8000` and can be overridden with
//! `TARGET_URL`.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

const REQUESTS: usize = 5_000;
const MAX_IN_FLIGHT: usize = 600;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base = std::env::var("TARGET_URL").unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());
    let url = format!("{}/send", base.trim_end_matches('/'));
    let data = serde_json::json!({"name": "Steve"});
    let client = reqwest::Client::new();

    let result = client.post(&url).json(&data).send().await?;
    println!("single request: {}", result.status());

    let permits = Arc::new(Semaphore::new(MAX_IN_FLIGHT));
    let mut jobs = JoinSet::new();
    let start = Instant::now();

    for _ in 0..REQUESTS {
        let permit = Arc::clone(&permits).acquire_owned().await?;
        let client = client.clone();
        let url = url.clone();
        let data = data.clone();
        jobs.spawn(async move {
            let _permit = permit;
            client.post(&url).json(&data).send().await.map(|r| r.status().is_success())
        });
    }

    let mut ok = 0usize;
    let mut failed = 0usize;
    while let Some(job) = jobs.join_next().await {
        match job {
            Ok(Ok(true)) => ok += 1,
            _ => failed += 1,
        }
    }

    let elapsed = start.elapsed();
    println!("{} ok, {} failed in {:?} (~{:.0} req/s)",
        ok,
        failed,
        elapsed,
        REQUESTS as f64 / elapsed.as_secs_f64()
    );
    Ok(())
}
