use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::accumulator::Accumulator;
use crate::error::EngineError;
use crate::partition::{PartitionClock, PartitionKey, PartitionKeyGenerator};
use crate::record::{encode_ndjson, Record};
use crate::scheduler::FlushScheduler;
use crate::sink::{SinkError, StorageSink};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How a failed batch write is retried before the batch is requeued.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total write attempts per flush, including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Backoff to wait after `current`: doubled, capped at `max_backoff`.
    pub fn next_backoff(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
        }
    }
}

/// Engine configuration.
///
/// **Fields**
/// - `buffer_limit`: maximum records per batch, and the buffer length that
///   triggers a flush without waiting for the timer.
/// - `flush_interval`: a flush is forced when this much time has passed
///   since the previous one.
/// - `poll_interval`: how often the scheduler checks the deadline. Timer
///   flushes may be late by up to this much.
/// - `partition_clock`: time zone of the `YYYY/MM/DD/HH` partition.
/// - `retry`: storage write retry policy.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub buffer_limit: usize,
    pub flush_interval: Duration,
    pub poll_interval: Duration,
    pub partition_clock: PartitionClock,
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_limit: 100,
            flush_interval: Duration::from_secs(120),
            poll_interval: Duration::from_secs(2),
            partition_clock: PartitionClock::default(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Result of a single flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The buffer was empty; only the deadline moved.
    Empty,
    /// A batch of `records` records was stored under `key`.
    Written { key: PartitionKey, records: usize },
}

/// Point-in-time copy of the engine counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub records_received: u64,
    pub records_written: u64,
    pub batches_written: u64,
    pub failed_writes: u64,
    pub pending: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Running,
    Draining,
    Stopped,
}

/// State shared between the engine handle, the scheduler and flush tasks.
pub(crate) struct EngineCore {
    pub(crate) accumulator: Accumulator,
    sink: Arc<dyn StorageSink>,
    keys: PartitionKeyGenerator,
    retry: RetryPolicy,
    size_flush_pending: AtomicBool,
    records_received: AtomicU64,
    records_written: AtomicU64,
    batches_written: AtomicU64,
    failed_writes: AtomicU64,
}

impl EngineCore {
    /// Reset the deadline, take up to `buffer_limit` records and write them.
    ///
    /// The buffer lock is held only while the batch is split off; encoding
    /// and storage I/O run without it. On failure the batch is requeued.
    pub(crate) async fn flush(&self) -> Result<FlushOutcome, EngineError> {
        let Some(batch) = self.accumulator.take_batch(Instant::now()) else {
            debug!("no records to flush");
            return Ok(FlushOutcome::Empty);
        };

        let records = batch.len();
        let blob = match encode_ndjson(&batch) {
            Ok(blob) => blob,
            Err(source) => {
                self.accumulator.requeue(batch);
                error!(records, error = %source, "could not encode batch, records requeued");
                return Err(EngineError::Encode { records, source });
            }
        };
        let key = self.keys.next_key();

        match self.write_with_retry(&key, blob).await {
            Ok(()) => {
                self.batches_written.fetch_add(1, Ordering::Relaxed);
                self.records_written
                    .fetch_add(records as u64, Ordering::Relaxed);
                info!(records, key = %key, "wrote batch");
                Ok(FlushOutcome::Written { key, records })
            }
            Err(source) => {
                self.failed_writes.fetch_add(1, Ordering::Relaxed);
                self.accumulator.requeue(batch);
                error!(
                    records,
                    key = %key,
                    error = %source,
                    "giving up on batch write, records requeued"
                );
                Err(EngineError::Storage {
                    key: key.to_string(),
                    records,
                    source,
                })
            }
        }
    }

    async fn write_with_retry(&self, key: &PartitionKey, blob: Bytes) -> Result<(), SinkError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut backoff = self.retry.initial_backoff;
        let mut attempt = 1;

        loop {
            match self.sink.write(key.as_str(), blob.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    warn!(
                        attempt,
                        key = %key,
                        error = %e,
                        "batch write failed, retrying in {:?}",
                        backoff
                    );
                    sleep(backoff).await;
                    backoff = self.retry.next_backoff(backoff);
                    attempt += 1;
                }
            }
        }
    }

    /// Flush until the buffer drops below the limit. Only one of these runs
    /// at a time; see [`BatchEngine::add_record`].
    async fn run_size_flush(self: Arc<Self>) {
        loop {
            let result = self.flush().await;
            self.size_flush_pending.store(false, Ordering::Release);

            if let Err(e) = result {
                warn!(error = %e, "size-triggered flush failed");
                return;
            }
            if self.accumulator.len() < self.accumulator.limit() {
                return;
            }
            if self.size_flush_pending.swap(true, Ordering::AcqRel) {
                // Another producer already dispatched a flush.
                return;
            }
        }
    }
}

/// Buffers records in memory and persists them as NDJSON batches.
///
/// A flush happens when the buffer reaches `buffer_limit` records or when
/// `flush_interval` has elapsed since the last flush, whichever comes
/// first. Each flush writes at most `buffer_limit` records as one object
/// named by a fresh [`PartitionKey`].
///
/// The engine must be torn down with [`BatchEngine::shutdown`], which
/// drains every pending record. Dropping it without shutting down loses
/// whatever is still buffered.
///
/// ```no_run
/// use std::sync::Arc;
/// use ndjson_batch_sink::engine::{BatchEngine, EngineConfig};
/// use ndjson_batch_sink::local::LocalSink;
///
/// # async fn run() -> Result<(), ndjson_batch_sink::error::EngineError> {
/// let engine = BatchEngine::start(Arc::new(LocalSink::new("/tmp/")), EngineConfig::default());
/// engine.add_record(serde_json::json!({"name": "Steve"}))?;
/// engine.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct BatchEngine {
    core: Arc<EngineCore>,
    lifecycle: RwLock<Lifecycle>,
    scheduler: Mutex<Option<FlushScheduler>>,
    flush_tasks: TaskTracker,
    cancel: CancellationToken,
}

impl BatchEngine {
    /// Create the engine and spawn its flush scheduler.
    ///
    /// Must be called from within a Tokio runtime. Minimal thresholds are
    /// enforced for `buffer_limit` and `poll_interval` to avoid degenerate
    /// configurations.
    pub fn start(sink: Arc<dyn StorageSink>, config: EngineConfig) -> Self {
        let poll_interval = config.poll_interval.max(MIN_POLL_INTERVAL);
        let accumulator = Accumulator::new(config.buffer_limit, config.flush_interval);

        info!(
            sink = %sink.describe(),
            buffer_limit = accumulator.limit(),
            flush_interval = ?config.flush_interval,
            "starting batch engine"
        );

        let core = Arc::new(EngineCore {
            accumulator,
            sink,
            keys: PartitionKeyGenerator::new(config.partition_clock),
            retry: config.retry,
            size_flush_pending: AtomicBool::new(false),
            records_received: AtomicU64::new(0),
            records_written: AtomicU64::new(0),
            batches_written: AtomicU64::new(0),
            failed_writes: AtomicU64::new(0),
        });

        let cancel = CancellationToken::new();
        let scheduler = FlushScheduler::spawn(Arc::clone(&core), poll_interval, cancel.child_token());

        Self {
            core,
            lifecycle: RwLock::new(Lifecycle::Running),
            scheduler: Mutex::new(Some(scheduler)),
            flush_tasks: TaskTracker::new(),
            cancel,
        }
    }

    /// Append a record to the buffer.
    ///
    /// Never blocks beyond the append. When the buffer reaches the limit a
    /// flush is dispatched in the background and not awaited.
    ///
    /// **Returns**
    /// - `Ok(())` once the record is buffered.
    /// - `Err(EngineError::Stopped)` if shutdown has begun.
    pub fn add_record(&self, record: Record) -> Result<(), EngineError> {
        // Held across the push so shutdown cannot start draining halfway
        // through an append.
        let lifecycle = self.lifecycle.read();
        if *lifecycle != Lifecycle::Running {
            return Err(EngineError::Stopped);
        }

        self.core.records_received.fetch_add(1, Ordering::Relaxed);
        let full = self.core.accumulator.push(record);

        if full && !self.core.size_flush_pending.swap(true, Ordering::AcqRel) {
            let core = Arc::clone(&self.core);
            self.flush_tasks.spawn(core.run_size_flush());
        }
        Ok(())
    }

    /// Flush one batch now, regardless of size or deadline.
    ///
    /// Drains at most `buffer_limit` records; call repeatedly (or use
    /// [`BatchEngine::shutdown`]) to empty a larger buffer.
    pub async fn flush(&self) -> Result<FlushOutcome, EngineError> {
        self.core.flush().await
    }

    /// Stop accepting records, wait for in-flight flushes and the scheduler,
    /// then flush until the buffer is empty.
    ///
    /// Stops at the first batch that cannot be written and returns that
    /// error; the records it held stay buffered. Calling `shutdown` again
    /// afterwards is a no-op.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        {
            let mut lifecycle = self.lifecycle.write();
            if *lifecycle != Lifecycle::Running {
                return Ok(());
            }
            *lifecycle = Lifecycle::Draining;
        }
        info!(pending = self.core.accumulator.len(), "shutting down batch engine");

        let scheduler = self.scheduler.lock().take();
        if let Some(scheduler) = scheduler {
            scheduler.stop().await;
        }
        self.flush_tasks.close();
        self.flush_tasks.wait().await;

        let mut result = Ok(());
        while !self.core.accumulator.is_empty() {
            if let Err(e) = self.core.flush().await {
                error!(
                    unpersisted = self.core.accumulator.len(),
                    "shutdown drain aborted"
                );
                result = Err(e);
                break;
            }
        }

        *self.lifecycle.write() = Lifecycle::Stopped;
        self.cancel.cancel();
        info!("shutdown complete");
        result
    }

    /// When the next timer flush is due.
    pub fn next_flush_time(&self) -> Instant {
        self.core.accumulator.next_flush()
    }

    /// Number of records currently buffered.
    pub fn pending(&self) -> usize {
        self.core.accumulator.len()
    }

    pub fn is_running(&self) -> bool {
        *self.lifecycle.read() == Lifecycle::Running
    }

    pub fn stats(&self) -> EngineStats {
        let core = &self.core;
        EngineStats {
            records_received: core.records_received.load(Ordering::Relaxed),
            records_written: core.records_written.load(Ordering::Relaxed),
            batches_written: core.batches_written.load(Ordering::Relaxed),
            failed_writes: core.failed_writes.load(Ordering::Relaxed),
            pending: core.accumulator.len(),
        }
    }
}

impl Drop for BatchEngine {
    fn drop(&mut self) {
        self.cancel.cancel();
        let pending = self.core.accumulator.len();
        if *self.lifecycle.get_mut() != Lifecycle::Stopped && pending > 0 {
            warn!(pending, "batch engine dropped without shutdown, buffered records are lost");
        }
    }
}
