#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use ndjson_batch_sink::sink::{SinkError, StorageSink};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};

/// In-memory sink that records every successful write and can be told to
/// fail a number of upcoming writes.
#[derive(Default)]
pub struct RecordingSink {
    writes: Mutex<Vec<(String, Bytes)>>,
    failures_left: AtomicU32,
    attempts: AtomicU32,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, n: u32) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<(String, Bytes)> {
        self.writes.lock().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    /// Every written object parsed back into its records, one `Vec` per
    /// object, in write order.
    pub fn batches(&self) -> Vec<Vec<Value>> {
        self.writes()
            .iter()
            .map(|(_, blob)| parse_ndjson(blob))
            .collect()
    }

    pub fn all_records(&self) -> Vec<Value> {
        self.batches().into_iter().flatten().collect()
    }
}

#[async_trait]
impl StorageSink for RecordingSink {
    async fn write(&self, key: &str, blob: Bytes) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err("injected storage failure".into());
        }
        self.writes.lock().push((key.to_string(), blob));
        Ok(())
    }

    fn describe(&self) -> String {
        "recording".to_string()
    }
}

pub fn parse_ndjson(blob: &[u8]) -> Vec<Value> {
    let text = std::str::from_utf8(blob).expect("utf-8 batch");
    assert!(text.is_empty() || text.ends_with('\n'), "batch must end with newline");
    text.lines()
        .map(|line| serde_json::from_str(line).expect("each line is valid json"))
        .collect()
}
