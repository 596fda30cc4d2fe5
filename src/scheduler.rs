use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::accumulator::deadline_after;
use crate::engine::EngineCore;

/// Background task that triggers time-based flushes.
///
/// Every `poll_interval` it checks whether the flush deadline has passed
/// and, if so, flushes. The deadline is owned by the accumulator and reset
/// by every flush regardless of what triggered it, so a size-triggered
/// flush also postpones the next timer flush.
pub struct FlushScheduler {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl FlushScheduler {
    pub(crate) fn spawn(
        core: Arc<EngineCore>,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(deadline_after(Instant::now(), poll_interval), poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if !core.accumulator.is_due(Instant::now()) {
                            continue;
                        }
                        if let Err(e) = core.flush().await {
                            warn!(error = %e, "timer flush failed");
                        }
                    }
                }
            }
            debug!("flush scheduler stopped");
        });

        Self { cancel, handle }
    }

    /// Signal the loop to stop and wait until it has exited.
    ///
    /// A flush already running inside the loop completes first.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "flush scheduler task panicked");
        }
    }
}
