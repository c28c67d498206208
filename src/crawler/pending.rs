//! Termination detection for the download/parse pipeline
//!
//! Work is counted from the moment it is enqueued until it has been fully handled. A task
//! always increments the counter of the next stage before decrementing its own, so both
//! counters read zero only when no task exists anywhere in the pipeline.
//!
//! Both counters share one atomic word (downloads in the high half, parses in the low
//! half) so that every read sees the two of them at the same instant.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

const DOWNLOAD: u64 = 1 << 32;
const PARSE: u64 = 1;
const PARSE_MASK: u64 = DOWNLOAD - 1;

/// In-flight work counters shared by all workers
#[derive(Debug, Default)]
pub struct PendingWork {
    counts: AtomicU64,
    drained: Notify,
}

impl PendingWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// A download task was enqueued
    pub fn download_added(&self) {
        self.counts.fetch_add(DOWNLOAD, Ordering::SeqCst);
    }

    /// A download task was dropped or handed to the parse stage
    pub fn download_done(&self) {
        self.release(DOWNLOAD);
    }

    /// A parse task was enqueued
    pub fn parse_added(&self) {
        self.counts.fetch_add(PARSE, Ordering::SeqCst);
    }

    /// A parse task was dropped or fully written
    pub fn parse_done(&self) {
        self.release(PARSE);
    }

    fn release(&self, unit: u64) {
        if self.counts.fetch_sub(unit, Ordering::SeqCst) == unit {
            self.drained.notify_one();
        }
    }

    pub fn downloads(&self) -> usize {
        (self.counts.load(Ordering::SeqCst) >> 32) as usize
    }

    pub fn parses(&self) -> usize {
        (self.counts.load(Ordering::SeqCst) & PARSE_MASK) as usize
    }

    /// True when no task is queued or being handled
    pub fn is_drained(&self) -> bool {
        self.counts.load(Ordering::SeqCst) == 0
    }

    /// Fires `shutdown` once both counters reach zero
    ///
    /// Returns early, without firing, if `shutdown` is cancelled by someone else.
    pub async fn watch(&self, shutdown: CancellationToken) {
        loop {
            if self.is_drained() {
                tracing::info!("No pending work left, shutting down");
                shutdown.cancel();
                return;
            }

            tokio::select! {
                _ = self.drained.notified() => {}
                _ = shutdown.cancelled() => return,
            }
        }
    }
}
