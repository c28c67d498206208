//! Download/parse pipeline
//!
//! This module runs the mirror:
//! - Download workers take tasks from the download queue, apply the depth limit and the
//!   processed set, and fetch the document
//! - Parse workers take fetched documents from the bounded parse queue, rewrite them,
//!   store them, and enqueue every discovered task
//! - A watcher fires the shared shutdown signal once no work is left anywhere
//!
//! Failures are local to their task, except for failures of a required task (the root
//! page) and write failures, which abort the whole run.

use crate::config::MirrorConfig;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::pending::PendingWork;
use crate::crawler::task::{CrawlTask, ParseTask};
use crate::crawler::writer::Writer;
use crate::output::{MirrorStats, MirrorSummary};
use crate::parser::{parse_document, ParseContext};
use crate::url::{canonical, LinkFilter, PathResolver, PAGES};
use crate::{LinkError, MirrorError, Result};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, Sender, UnboundedSender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use url::Url;

type SharedQueue<R> = Arc<tokio::sync::Mutex<R>>;

/// State shared by every worker of a run
struct Pipeline {
    config: MirrorConfig,
    root: Url,
    context: ParseContext,
    fetcher: Arc<dyn Fetcher>,
    writer: Arc<dyn Writer>,
    processed: Mutex<HashSet<String>>,
    pending: PendingWork,
    stats: MirrorStats,
    shutdown: CancellationToken,
}

/// Runs one mirror from its root page until no work is left
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use sumi_mirror::crawler::{CrawlScheduler, FsWriter, HttpFetcher};
/// use sumi_mirror::MirrorConfig;
///
/// # async fn run() -> sumi_mirror::Result<()> {
/// let config = MirrorConfig::new("https://example.com/");
/// let writer = Arc::new(FsWriter::new(&config.output_dir));
/// let scheduler = CrawlScheduler::new(config, Arc::new(HttpFetcher::new()?), writer)?;
/// let summary = scheduler.run().await?;
/// println!("{} files written", summary.written);
/// # Ok(())
/// # }
/// ```
pub struct CrawlScheduler {
    pipeline: Arc<Pipeline>,
}

impl CrawlScheduler {
    /// Prepares a run; nothing is fetched until [`CrawlScheduler::run`]
    ///
    /// # Arguments
    ///
    /// * `config` - A validated configuration
    /// * `fetcher` - Downloads documents
    /// * `writer` - Stores rewritten documents
    pub fn new(
        config: MirrorConfig,
        fetcher: Arc<dyn Fetcher>,
        writer: Arc<dyn Writer>,
    ) -> Result<Self> {
        let root = Url::parse(&config.root_url).map_err(|source| LinkError::Parse {
            link: config.root_url.clone(),
            source,
        })?;
        let filter = LinkFilter::from_config(&config)?;
        let context = ParseContext::new(PathResolver::new(&root), filter)?;

        Ok(Self {
            pipeline: Arc::new(Pipeline {
                config,
                root,
                context,
                fetcher,
                writer,
                processed: Mutex::new(HashSet::new()),
                pending: PendingWork::new(),
                stats: MirrorStats::new(),
                shutdown: CancellationToken::new(),
            }),
        })
    }

    /// The shutdown signal of this run
    ///
    /// Cancelling it stops every worker; the run then returns a summary marked as not
    /// completed.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.pipeline.shutdown.clone()
    }

    /// The URL to file mapping built by this run
    pub fn resolver(&self) -> &PathResolver {
        self.pipeline.context.resolver()
    }

    /// Current counters
    pub fn stats(&self) -> MirrorSummary {
        self.pipeline
            .stats
            .summary(self.pipeline.pending.is_drained())
    }

    /// Mirrors the site; a scheduler is meant to be run once
    ///
    /// # Returns
    ///
    /// * `Ok(MirrorSummary)` - The pipeline drained or was interrupted
    /// * `Err(MirrorError)` - A required task failed or a file could not be written
    pub async fn run(&self) -> Result<MirrorSummary> {
        let pipeline = &self.pipeline;
        let config = &pipeline.config;

        let root = pipeline
            .context
            .resolver()
            .resolve(pipeline.root.as_str(), &pipeline.root, PAGES)?;
        let root_task = CrawlTask::root(root.url, root.local_path);

        tracing::info!(
            "Mirroring {} (prefix {}, max depth {}, {} download / {} parse workers)",
            root_task.url,
            pipeline.context.filter().required_prefix(),
            config.max_depth,
            config.download_concurrency,
            config.parse_concurrency
        );

        let (download_tx, download_rx) = mpsc::unbounded_channel::<CrawlTask>();
        let (parse_tx, parse_rx) = mpsc::channel::<ParseTask>(config.parse_queue_capacity());
        let download_rx: SharedQueue<_> = Arc::new(tokio::sync::Mutex::new(download_rx));
        let parse_rx: SharedQueue<_> = Arc::new(tokio::sync::Mutex::new(parse_rx));

        pipeline.pending.download_added();
        if download_tx.send(root_task).is_err() {
            pipeline.pending.download_done();
        }

        let mut workers = JoinSet::new();
        for index in 0..config.download_concurrency {
            let worker = download_worker(
                Arc::clone(pipeline),
                Arc::clone(&download_rx),
                parse_tx.clone(),
            );
            workers.spawn(worker.instrument(tracing::info_span!("download", worker = index)));
        }
        for index in 0..config.parse_concurrency {
            let worker = parse_worker(
                Arc::clone(pipeline),
                Arc::clone(&parse_rx),
                download_tx.clone(),
            );
            workers.spawn(worker.instrument(tracing::info_span!("parse", worker = index)));
        }
        drop((download_tx, parse_tx, download_rx, parse_rx));

        let watcher = tokio::spawn({
            let pipeline = Arc::clone(pipeline);
            async move {
                pipeline
                    .pending
                    .watch(pipeline.shutdown.clone())
                    .await
            }
        });

        let outcome = self.join_workers(&mut workers).await;
        watcher.abort();
        pipeline.stats.finish();
        outcome?;

        let summary = pipeline.stats.summary(pipeline.pending.is_drained());
        if summary.completed {
            tracing::info!(
                "Mirror complete: {} fetched, {} written",
                summary.fetched,
                summary.written
            );
        } else {
            tracing::warn!(
                "Mirror interrupted: {} fetched, {} written",
                summary.fetched,
                summary.written
            );
        }
        Ok(summary)
    }

    /// Waits for every worker; the first error cancels the run and aborts the rest
    async fn join_workers(&self, workers: &mut JoinSet<Result<()>>) -> Result<()> {
        while let Some(joined) = workers.join_next().await {
            let failure = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(e) if e.is_cancelled() => continue,
                Err(e) => MirrorError::Join(e),
            };

            tracing::error!("Aborting mirror: {}", failure);
            self.pipeline.shutdown.cancel();
            workers.abort_all();
            return Err(failure);
        }
        Ok(())
    }
}

async fn download_worker(
    pipeline: Arc<Pipeline>,
    queue: SharedQueue<mpsc::UnboundedReceiver<CrawlTask>>,
    parse_tx: Sender<ParseTask>,
) -> Result<()> {
    while !pipeline.pending.is_drained() {
        let task = tokio::select! {
            biased;
            _ = pipeline.shutdown.cancelled() => break,
            task = async { queue.lock().await.recv().await } => match task {
                Some(task) => task,
                None => break,
            },
        };
        pipeline.download(task, &parse_tx).await?;
    }
    tracing::debug!("Download worker exiting");
    Ok(())
}

async fn parse_worker(
    pipeline: Arc<Pipeline>,
    queue: SharedQueue<mpsc::Receiver<ParseTask>>,
    download_tx: UnboundedSender<CrawlTask>,
) -> Result<()> {
    while !pipeline.pending.is_drained() {
        let task = tokio::select! {
            biased;
            _ = pipeline.shutdown.cancelled() => break,
            task = async { queue.lock().await.recv().await } => match task {
                Some(task) => task,
                None => break,
            },
        };
        pipeline.parse(task, &download_tx).await?;
    }
    tracing::debug!("Parse worker exiting");
    Ok(())
}

impl Pipeline {
    /// Records `url` as accepted for download; false if it already was
    fn mark_processed(&self, url: &Url) -> bool {
        self.processed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(canonical(url).into())
    }

    async fn download(&self, task: CrawlTask, parse_tx: &Sender<ParseTask>) -> Result<()> {
        if task.depth > self.config.max_depth {
            tracing::debug!(
                "Skipping {}: depth {} exceeds {}",
                task.url,
                task.depth,
                self.config.max_depth
            );
            self.stats.record_depth_drop();
            self.pending.download_done();
            return Ok(());
        }

        if !self.mark_processed(&task.url) {
            tracing::debug!("Skipping {}: already processed", task.url);
            self.stats.record_duplicate();
            self.pending.download_done();
            return Ok(());
        }

        tracing::info!("Downloading {} to {}", task.url, task.local_path);
        let fetched = tokio::select! {
            fetched = self.fetcher.fetch(&task.url) => fetched,
            _ = self.shutdown.cancelled() => return Ok(()),
        };

        let result = match fetched {
            Ok(result) => result,
            Err(e) => {
                self.stats.record_fetch_failure();
                if task.required {
                    return Err(MirrorError::RequiredTaskFailed {
                        url: task.url.to_string(),
                        reason: e.to_string(),
                    });
                }
                tracing::warn!("Error downloading {}: {}", task.url, e);
                self.pending.download_done();
                return Ok(());
            }
        };

        self.stats.record_fetch(result.content.len());
        self.pending.parse_added();
        let parse_task = ParseTask {
            task,
            base: result.url,
            body: result.content,
            content_type: result.content_type,
        };

        tokio::select! {
            sent = parse_tx.send(parse_task) => {
                if sent.is_err() {
                    self.pending.parse_done();
                }
            }
            _ = self.shutdown.cancelled() => self.pending.parse_done(),
        }
        self.pending.download_done();
        Ok(())
    }

    async fn parse(&self, parse_task: ParseTask, download_tx: &UnboundedSender<CrawlTask>) -> Result<()> {
        let output = match parse_document(&self.context, &parse_task) {
            Ok(output) => output,
            Err(e) => {
                self.stats.record_unsupported();
                let task = &parse_task.task;
                if task.required {
                    return Err(MirrorError::RequiredTaskFailed {
                        url: task.url.to_string(),
                        reason: e.to_string(),
                    });
                }
                tracing::warn!(
                    "Error parsing {} ({}): {}",
                    task.url,
                    parse_task.content_type,
                    e
                );
                self.pending.parse_done();
                return Ok(());
            }
        };

        let task = &parse_task.task;
        if parse_task.base != task.url {
            tracing::debug!("{} was served from {}", task.url, parse_task.base);
        }
        self.writer
            .write(Path::new(&task.local_path), &output.content)
            .await?;
        self.stats.record_write();

        tracing::info!(
            "Processed {}, returned {} new downloads",
            task.url,
            output.discovered.len()
        );
        self.stats.record_discovered(output.discovered.len());

        for found in output.discovered {
            self.pending.download_added();
            if download_tx.send(found).is_err() {
                self.pending.download_done();
            }
        }
        self.pending.parse_done();
        Ok(())
    }
}
