//! Statistics collected while mirroring
//!
//! Workers update [`MirrorStats`] through atomic counters; a [`MirrorSummary`] snapshot is
//! taken when the run ends.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Live counters shared by every worker of a run
#[derive(Debug)]
pub struct MirrorStats {
    started_at: DateTime<Utc>,
    finished_at: Mutex<Option<DateTime<Utc>>>,
    fetched: AtomicU64,
    bytes_fetched: AtomicU64,
    written: AtomicU64,
    dropped_depth: AtomicU64,
    dropped_duplicate: AtomicU64,
    fetch_failures: AtomicU64,
    unsupported: AtomicU64,
    discovered: AtomicU64,
}

impl Default for MirrorStats {
    fn default() -> Self {
        Self::new()
    }
}

impl MirrorStats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: Mutex::new(None),
            fetched: AtomicU64::new(0),
            bytes_fetched: AtomicU64::new(0),
            written: AtomicU64::new(0),
            dropped_depth: AtomicU64::new(0),
            dropped_duplicate: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            unsupported: AtomicU64::new(0),
            discovered: AtomicU64::new(0),
        }
    }

    pub fn record_fetch(&self, bytes: usize) {
        self.fetched.fetch_add(1, Ordering::Relaxed);
        self.bytes_fetched.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_depth_drop(&self) {
        self.dropped_depth.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.dropped_duplicate.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unsupported(&self) {
        self.unsupported.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discovered(&self, count: usize) {
        self.discovered.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Marks the end of the run; only the first call has an effect
    pub fn finish(&self) {
        let mut finished_at = self
            .finished_at
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        finished_at.get_or_insert_with(Utc::now);
    }

    /// Takes a consistent-enough snapshot of the counters
    ///
    /// # Arguments
    ///
    /// * `completed` - Whether the pipeline drained on its own rather than being interrupted
    pub fn summary(&self, completed: bool) -> MirrorSummary {
        let finished_at = *self
            .finished_at
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        MirrorSummary {
            started_at: self.started_at,
            finished_at,
            completed,
            fetched: self.fetched.load(Ordering::Relaxed),
            bytes_fetched: self.bytes_fetched.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            dropped_depth: self.dropped_depth.load(Ordering::Relaxed),
            dropped_duplicate: self.dropped_duplicate.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            unsupported: self.unsupported.load(Ordering::Relaxed),
            discovered: self.discovered.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// False when the run was stopped by an interrupt before the pipeline drained
    pub completed: bool,

    /// Documents downloaded successfully
    pub fetched: u64,
    pub bytes_fetched: u64,

    /// Files written to the output directory
    pub written: u64,

    /// Tasks dropped because they were deeper than the maximum depth
    pub dropped_depth: u64,

    /// Tasks dropped because their URL had already been accepted
    pub dropped_duplicate: u64,

    pub fetch_failures: u64,

    /// Documents whose content type has no parser
    pub unsupported: u64,

    /// Tasks emitted by parsers
    pub discovered: u64,
}

impl MirrorSummary {
    /// Run duration in seconds, if the run has finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}

/// Prints the summary to stdout in a formatted manner
pub fn print_summary(summary: &MirrorSummary) {
    println!("=== Mirror Summary ===\n");

    println!("Run:");
    println!("  Started: {}", summary.started_at.to_rfc3339());
    if let Some(finished) = summary.finished_at {
        println!("  Finished: {}", finished.to_rfc3339());
    }
    if let Some(duration) = summary.duration_seconds() {
        println!("  Duration: {}s", duration);
    }
    println!(
        "  Status: {}",
        if summary.completed {
            "completed"
        } else {
            "interrupted"
        }
    );
    println!();

    println!("Documents:");
    println!("  Fetched: {} ({} bytes)", summary.fetched, summary.bytes_fetched);
    println!("  Written: {}", summary.written);
    println!("  Discovered links: {}", summary.discovered);
    println!();

    println!("Skipped:");
    println!("  Too deep: {}", summary.dropped_depth);
    println!("  Already processed: {}", summary.dropped_duplicate);
    println!("  Unsupported content type: {}", summary.unsupported);
    println!();

    if summary.fetch_failures > 0 {
        println!("Failures:");
        println!("  Fetch: {}", summary.fetch_failures);
        println!();
    }
}
