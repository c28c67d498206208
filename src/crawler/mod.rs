//! Crawler module for downloading and storing the mirror
//!
//! This module contains the core mirroring logic, including:
//! - HTTP fetching behind the [`Fetcher`] trait
//! - File output behind the [`Writer`] trait
//! - The concurrent download/parse pipeline and its termination detection

mod fetcher;
mod pending;
mod scheduler;
mod task;
mod writer;

pub use fetcher::{build_http_client, FetchResult, Fetcher, HttpFetcher, USER_AGENT};
pub use pending::PendingWork;
pub use scheduler::CrawlScheduler;
pub use task::{CrawlTask, ParseTask};
pub use writer::{FsWriter, Writer};

use crate::config::MirrorConfig;
use crate::output::MirrorSummary;
use crate::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs a complete mirror over HTTP into the configured output directory
///
/// This is the main entry point for mirroring a site. It will:
/// 1. Build the HTTP client
/// 2. Resolve the root page to `index.html`
/// 3. Download, rewrite, and store every reachable document
/// 4. Return the run summary
///
/// # Arguments
///
/// * `config` - A validated configuration
/// * `shutdown` - Cancelling this token stops the run early
///
/// # Returns
///
/// * `Ok(MirrorSummary)` - The run finished or was interrupted
/// * `Err(MirrorError)` - A fatal failure aborted the run
pub async fn mirror(config: MirrorConfig, shutdown: Option<CancellationToken>) -> Result<MirrorSummary> {
    let fetcher = Arc::new(HttpFetcher::new()?);
    let writer = Arc::new(FsWriter::new(&config.output_dir));
    let scheduler = CrawlScheduler::new(config, fetcher, writer)?;

    if let Some(shutdown) = shutdown {
        let token = scheduler.cancellation_token();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => token.cancel(),
                _ = token.cancelled() => {}
            }
        });
    }

    scheduler.run().await
}
