use parking_lot::Mutex;
use std::mem;
use tokio::time::{Duration, Instant};

use crate::record::Record;

/// Stand-in for "never" when a deadline would overflow `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + interval`, saturating at roughly thirty years ahead.
pub(crate) fn deadline_after(now: Instant, interval: Duration) -> Instant {
    now.checked_add(interval).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Lock-guarded buffer of pending records plus the next flush deadline.
///
/// Both pieces of mutable state live behind one mutex. Every method holds
/// it only for a push, a split or a read; serialization and storage I/O
/// happen on the returned batch after the lock is released.
pub struct Accumulator {
    limit: usize,
    flush_interval: Duration,
    state: Mutex<State>,
}

struct State {
    records: Vec<Record>,
    next_flush: Instant,
}

impl Accumulator {
    /// `limit` is clamped to at least one record.
    pub fn new(limit: usize, flush_interval: Duration) -> Self {
        Self {
            limit: limit.max(1),
            flush_interval,
            state: Mutex::new(State {
                records: Vec::new(),
                next_flush: deadline_after(Instant::now(), flush_interval),
            }),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Append a record. Returns `true` when the buffer has reached the limit
    /// and a size-triggered flush should be dispatched.
    pub fn push(&self, record: Record) -> bool {
        let mut state = self.state.lock();
        state.records.push(record);
        state.records.len() >= self.limit
    }

    /// Reset the deadline to `now + flush_interval` and take up to `limit`
    /// records from the front of the buffer.
    ///
    /// Returns `None` if the buffer was empty; the deadline is reset either
    /// way. The returned batch and the records left behind never overlap.
    pub fn take_batch(&self, now: Instant) -> Option<Vec<Record>> {
        let mut state = self.state.lock();
        state.next_flush = deadline_after(now, self.flush_interval);
        if state.records.is_empty() {
            return None;
        }
        let n = state.records.len().min(self.limit);
        let rest = state.records.split_off(n);
        Some(mem::replace(&mut state.records, rest))
    }

    /// Put a batch that could not be written back in front of everything
    /// appended since it was taken, preserving its order.
    pub fn requeue(&self, mut batch: Vec<Record>) {
        if batch.is_empty() {
            return;
        }
        let mut state = self.state.lock();
        batch.append(&mut state.records);
        state.records = batch;
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.state.lock().next_flush
    }

    pub fn next_flush(&self) -> Instant {
        self.state.lock().next_flush
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }
}
